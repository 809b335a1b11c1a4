use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use super::ProgressTx;
use super::sql_fragment::{ACHIEVEMENT_FIELDS, ATTEMPT_FIELDS, STATS_FIELDS};
use crate::db::prelude::{Achievement, QuizAttempt, QuizDelta, QuizSubmission, UserId, UserStats};
use crate::db::{DbError, DbResult};

/// Postgres transaction checked out from the pool.
///
/// The connection goes back to the pool when this is committed, rolled back or dropped; a drop
/// without commit rolls back.
pub struct PgTx {
    inner: Option<Transaction<'static, Postgres>>,
}

impl PgTx {
    #[instrument(skip(pool))]
    pub async fn begin(pool: &PgPool) -> DbResult<Self> {
        let inner = pool.begin().await?;
        Ok(Self { inner: Some(inner) })
    }

    fn inner_mut(&mut self) -> DbResult<&mut Transaction<'static, Postgres>> {
        self.inner.as_mut().ok_or(DbError::TxCompleted)
    }
}

#[async_trait]
impl ProgressTx for PgTx {
    #[instrument(skip(self, user_id), fields(%user_id))]
    async fn lock_stats(&mut self, user_id: &UserId) -> DbResult<Option<UserStats>> {
        let stats = sqlx::query_as::<_, UserStats>(&format!(
            "SELECT {STATS_FIELDS} FROM user_stats WHERE user_id = $1 FOR UPDATE"
        ))
        .bind(user_id)
        .fetch_optional(&mut **self.inner_mut()?)
        .await?;

        Ok(stats)
    }

    #[instrument(skip(self, stats), fields(user_id = %stats.user_id))]
    async fn create_stats(&mut self, stats: &UserStats) -> DbResult<bool> {
        let created = sqlx::query_scalar::<_, UserId>(
            r#"
            INSERT INTO user_stats (
                user_id,
                xp,
                level,
                streak,
                last_quiz_date,
                total_quizzes,
                correct_answers
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id)
            DO NOTHING
            RETURNING user_id
            "#,
        )
        .bind(stats.user_id)
        .bind(stats.xp)
        .bind(stats.level)
        .bind(stats.streak)
        .bind(stats.last_quiz_date)
        .bind(stats.total_quizzes)
        .bind(stats.correct_answers)
        .fetch_optional(&mut **self.inner_mut()?)
        .await?;

        Ok(created.is_some())
    }

    #[instrument(skip(self, user_id, delta), fields(%user_id, xp_gain = delta.xp_gain, streak = delta.streak))]
    async fn apply_quiz(&mut self, user_id: &UserId, delta: &QuizDelta) -> DbResult<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(&format!(
            r#"
            UPDATE user_stats
            SET
                xp = xp + $2,
                total_quizzes = total_quizzes + 1,
                correct_answers = correct_answers + $3,
                streak = $4,
                last_quiz_date = $5
            WHERE user_id = $1
            RETURNING {STATS_FIELDS}
            "#
        ))
        .bind(user_id)
        .bind(delta.xp_gain)
        .bind(delta.correct_answers)
        .bind(delta.streak)
        .bind(delta.quiz_date)
        .fetch_one(&mut **self.inner_mut()?)
        .await?;

        Ok(stats)
    }

    #[instrument(skip(self, user_id), fields(%user_id))]
    async fn set_level(&mut self, user_id: &UserId, level: i32) -> DbResult<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(&format!(
            "UPDATE user_stats SET level = $2 WHERE user_id = $1 RETURNING {STATS_FIELDS}"
        ))
        .bind(user_id)
        .bind(level)
        .fetch_one(&mut **self.inner_mut()?)
        .await?;

        Ok(stats)
    }

    #[instrument(skip(self, user_id), fields(%user_id))]
    async fn add_xp(&mut self, user_id: &UserId, amount: i64) -> DbResult<UserStats> {
        let stats = sqlx::query_as::<_, UserStats>(&format!(
            "UPDATE user_stats SET xp = xp + $2 WHERE user_id = $1 RETURNING {STATS_FIELDS}"
        ))
        .bind(user_id)
        .bind(amount)
        .fetch_one(&mut **self.inner_mut()?)
        .await?;

        Ok(stats)
    }

    #[instrument(skip(self))]
    async fn achievement_by_key(&mut self, key: &str) -> DbResult<Option<Achievement>> {
        let achievement = sqlx::query_as::<_, Achievement>(&format!(
            "SELECT {ACHIEVEMENT_FIELDS} FROM achievements WHERE key = $1"
        ))
        .bind(key)
        .fetch_optional(&mut **self.inner_mut()?)
        .await?;

        Ok(achievement)
    }

    #[instrument(skip(self, user_id, achievement), fields(%user_id, key = %achievement.key))]
    async fn insert_unlock(
        &mut self,
        user_id: &UserId,
        achievement: &Achievement,
        unlocked_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        // the unique (user_id, achievement_id) key decides races: the loser gets no row back
        let inserted = sqlx::query_scalar::<_, UserId>(
            r#"
            INSERT INTO user_achievements (user_id, achievement_id, unlocked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, achievement_id)
            DO NOTHING
            RETURNING user_id
            "#,
        )
        .bind(user_id)
        .bind(achievement.id)
        .bind(unlocked_at)
        .fetch_optional(&mut **self.inner_mut()?)
        .await?;

        Ok(inserted.is_some())
    }

    #[instrument(skip(self, user_id, submission), fields(%user_id))]
    async fn insert_attempt(
        &mut self,
        user_id: &UserId,
        submission: &QuizSubmission,
        created_at: DateTime<Utc>,
    ) -> DbResult<QuizAttempt> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(&format!(
            r#"
            INSERT INTO quiz_attempts (
                user_id,
                score,
                total_questions,
                correct_answers,
                created_at
            )
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ATTEMPT_FIELDS}
            "#
        ))
        .bind(user_id)
        .bind(submission.score())
        .bind(submission.total_questions())
        .bind(submission.correct_answers())
        .bind(created_at)
        .fetch_one(&mut **self.inner_mut()?)
        .await?;

        Ok(attempt)
    }

    #[instrument(skip(self))]
    async fn commit(self: Box<Self>) -> DbResult<()> {
        let Self { inner } = *self;
        match inner {
            Some(tx) => Ok(tx.commit().await?),
            None => Err(DbError::TxCompleted),
        }
    }

    #[instrument(skip(self))]
    async fn rollback(self: Box<Self>) -> DbResult<()> {
        let Self { inner } = *self;
        match inner {
            Some(tx) => Ok(tx.rollback().await?),
            None => Err(DbError::TxCompleted),
        }
    }
}
