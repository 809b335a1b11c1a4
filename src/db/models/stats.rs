use core::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new_v4() -> Self {
        UserId(Uuid::new_v4())
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        UserId(value)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Account role, as stored in `users.role`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    /// Only regular accounts appear on the leaderboard
    pub fn is_ranked(&self) -> bool {
        matches!(self, Role::User)
    }
}

/// `user_stats` table model, one row per account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserStats {
    pub user_id: UserId,
    pub xp: i64,
    pub level: i32,
    pub streak: i32,
    pub last_quiz_date: Option<NaiveDate>,
    pub total_quizzes: i32,
    pub correct_answers: i64,
}

impl UserStats {
    /// Row inserted at registration
    pub fn zeroed(user_id: UserId) -> Self {
        Self {
            user_id,
            xp: 0,
            level: 1,
            streak: 0,
            last_quiz_date: None,
            total_quizzes: 0,
            correct_answers: 0,
        }
    }
}

/// Increments applied to a stats row by a single quiz submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDelta {
    pub xp_gain: i64,
    pub correct_answers: i64,
    pub streak: i32,
    pub quiz_date: NaiveDate,
}

/// `quiz_attempts` table model; rows are never updated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizAttempt {
    pub id: i64,
    pub user_id: UserId,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub created_at: DateTime<Utc>,
}

/// A finished quiz as reported by the client.
///
/// Only constructible through [`QuizSubmission::new`] (or deserialization, which goes through
/// it), so `total_questions` is always at least one and no count is negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawQuizSubmission")]
pub struct QuizSubmission {
    score: i32,
    total_questions: i32,
    correct_answers: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuizSubmission {
    score: i64,
    total_questions: i64,
    correct_answers: i64,
}

impl QuizSubmission {
    pub fn new(
        score: i64,
        total_questions: i64,
        correct_answers: i64,
    ) -> Result<Self, SubmissionError> {
        if total_questions < 1 {
            return Err(SubmissionError::NoQuestions);
        }

        Ok(Self {
            score: to_count("score", score)?,
            total_questions: to_count("totalQuestions", total_questions)?,
            correct_answers: to_count("correctAnswers", correct_answers)?,
        })
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn total_questions(&self) -> i32 {
        self.total_questions
    }

    pub fn correct_answers(&self) -> i32 {
        self.correct_answers
    }

    pub fn xp_gain(&self) -> i64 {
        i64::from(self.correct_answers) * crate::constants::XP_PER_CORRECT_ANSWER
    }
}

impl TryFrom<RawQuizSubmission> for QuizSubmission {
    type Error = SubmissionError;

    fn try_from(raw: RawQuizSubmission) -> Result<Self, Self::Error> {
        QuizSubmission::new(raw.score, raw.total_questions, raw.correct_answers)
    }
}

fn to_count(field: &'static str, value: i64) -> Result<i32, SubmissionError> {
    if value < 0 {
        return Err(SubmissionError::Negative(field));
    }

    i32::try_from(value).map_err(|_| SubmissionError::OutOfRange(field))
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("a quiz must contain at least one question")]
    NoQuestions,

    #[error("'{0}' must not be negative")]
    Negative(&'static str),

    #[error("'{0}' is out of range")]
    OutOfRange(&'static str),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_submission_from_json() {
        let submission: QuizSubmission =
            serde_json::from_str(r#"{"score": 500, "totalQuestions": 10, "correctAnswers": 5}"#)
                .unwrap();

        assert_eq!(submission.score(), 500);
        assert_eq!(submission.total_questions(), 10);
        assert_eq!(submission.correct_answers(), 5);
        assert_eq!(submission.xp_gain(), 500);
    }

    #[test]
    fn test_submission_without_questions_rejected() {
        let parsed = serde_json::from_str::<QuizSubmission>(
            r#"{"score": 0, "totalQuestions": 0, "correctAnswers": 0}"#,
        );
        assert!(parsed.is_err());

        assert_eq!(
            QuizSubmission::new(0, 0, 0).unwrap_err(),
            SubmissionError::NoQuestions
        );
    }

    #[test]
    fn test_submission_bounds() {
        assert_eq!(
            QuizSubmission::new(10, 5, -1).unwrap_err(),
            SubmissionError::Negative("correctAnswers")
        );
        assert_eq!(
            QuizSubmission::new(i64::from(i32::MAX) + 1, 5, 1).unwrap_err(),
            SubmissionError::OutOfRange("score")
        );
        assert!(QuizSubmission::new(0, 1, 0).is_ok());
    }

    #[test]
    fn test_role_ranking() {
        assert!(Role::User.is_ranked());
        assert!(!Role::Admin.is_ranked());
    }
}
