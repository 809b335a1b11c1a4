use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use super::achievements::ACHIEVEMENT_RULES;
use super::level::compute_level;
use super::streak::next_streak;
use crate::db::DbError;
use crate::db::prelude::{ProgressStore, ProgressTx, QuizDelta, QuizSubmission, UserId, UserStats};

pub type ProgressResult<T> = core::result::Result<T, ProgressError>;

#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("no stats recorded for user '{0}'")]
    NotFound(UserId),

    #[error("transaction failed: {0}")]
    Transaction(#[from] DbError),
}

/// Result of a quiz submission: the committed stats row and the key of an achievement unlocked
/// by this submission, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub stats: UserStats,
    pub achievement_unlocked: Option<String>,
}

/// Applies quiz results to per-user stats.
pub struct StatsEngine<S> {
    store: S,
}

impl<S: ProgressStore> StatsEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates the zeroed stats row for a newly registered user. `Ok(false)` if it already
    /// exists.
    #[instrument(skip(self, user_id), fields(%user_id))]
    pub async fn init_stats(&self, user_id: &UserId) -> ProgressResult<bool> {
        let mut tx = self.store.begin().await?;

        match tx.create_stats(&UserStats::zeroed(*user_id)).await {
            Ok(created) => {
                tx.commit().await?;
                tracing::debug!(created, "initialized stats row");
                Ok(created)
            }
            Err(e) => {
                rollback(tx).await;
                Err(e.into())
            }
        }
    }

    pub async fn submit_quiz(
        &self,
        user_id: &UserId,
        submission: &QuizSubmission,
    ) -> ProgressResult<QuizOutcome> {
        self.submit_quiz_at(user_id, submission, Utc::now()).await
    }

    /// Records a quiz taken at `now`, all or nothing.
    ///
    /// Xp grows by 100 per correct answer, the streak follows the UTC calendar day of `now`, and
    /// at most one achievement is unlocked (and rewarded) per call.
    #[instrument(skip(self, user_id, submission), fields(%user_id, correct = submission.correct_answers()))]
    pub async fn submit_quiz_at(
        &self,
        user_id: &UserId,
        submission: &QuizSubmission,
        now: DateTime<Utc>,
    ) -> ProgressResult<QuizOutcome> {
        let mut tx = self.store.begin().await?;

        match record_quiz(&mut *tx, user_id, submission, now).await {
            Ok(outcome) => {
                tx.commit().await?;
                tracing::info!(
                    xp = outcome.stats.xp,
                    level = outcome.stats.level,
                    streak = outcome.stats.streak,
                    achievement = outcome.achievement_unlocked.as_deref(),
                    "quiz recorded"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::debug!(error = ?e, "quiz submission failed");
                rollback(tx).await;
                Err(e)
            }
        }
    }
}

async fn record_quiz(
    tx: &mut dyn ProgressTx,
    user_id: &UserId,
    submission: &QuizSubmission,
    now: DateTime<Utc>,
) -> ProgressResult<QuizOutcome> {
    let Some(current) = tx.lock_stats(user_id).await? else {
        return Err(ProgressError::NotFound(*user_id));
    };

    let today = now.date_naive();
    let delta = QuizDelta {
        xp_gain: submission.xp_gain(),
        correct_answers: i64::from(submission.correct_answers()),
        streak: next_streak(current.last_quiz_date, current.streak, today),
        quiz_date: today,
    };

    let updated = tx.apply_quiz(user_id, &delta).await?;
    // level follows the committed xp, never the value read before the update
    let mut stats = tx.set_level(user_id, compute_level(updated.xp)).await?;

    let mut achievement_unlocked = None;
    for rule in ACHIEVEMENT_RULES {
        if !rule.is_met(&stats) {
            continue;
        }

        let Some(achievement) = tx.achievement_by_key(rule.key).await? else {
            tracing::warn!(key = rule.key, "achievement rule has no reference row");
            continue;
        };

        if !tx.insert_unlock(user_id, &achievement, now).await? {
            continue;
        }

        let rewarded = tx.add_xp(user_id, achievement.xp_reward).await?;
        stats = tx.set_level(user_id, compute_level(rewarded.xp)).await?;

        tracing::info!(key = %achievement.key, reward = achievement.xp_reward, "achievement unlocked");
        achievement_unlocked = Some(achievement.key);
        break;
    }

    tx.insert_attempt(user_id, submission, now).await?;

    Ok(QuizOutcome {
        stats,
        achievement_unlocked,
    })
}

async fn rollback(tx: Box<dyn ProgressTx>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = ?e, "rollback failed");
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::db::DbResult;
    use crate::db::prelude::{
        Achievement, MemoryStore, QuizAttempt, RankedUser, Role, UnlockedAchievement,
    };
    use crate::progress::compute_level;

    const STREAK_REWARD: i64 = 500;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn quiz(correct: i64) -> QuizSubmission {
        QuizSubmission::new(correct * 100, 10, correct).unwrap()
    }

    async fn seeded_store(
        streak: i32,
        last_quiz_date: Option<NaiveDate>,
    ) -> (MemoryStore, UserId) {
        let store = MemoryStore::new();
        let user_id = UserId::new_v4();

        store.insert_user(user_id, "ana", None, Role::User).await;
        store
            .insert_achievement("7_day_streak", "Week on fire", STREAK_REWARD)
            .await;
        store
            .set_stats(UserStats {
                streak,
                last_quiz_date,
                ..UserStats::zeroed(user_id)
            })
            .await;

        (store, user_id)
    }

    #[tokio::test]
    async fn test_streak_continues_from_yesterday() {
        let (store, user) = seeded_store(4, Some(day(2025, 3, 9))).await;
        let engine = StatsEngine::new(store);

        let outcome = engine
            .submit_quiz_at(&user, &quiz(2), at(2025, 3, 10))
            .await
            .unwrap();

        assert_eq!(outcome.stats.streak, 5);
        assert_eq!(outcome.stats.last_quiz_date, Some(day(2025, 3, 10)));
        assert_eq!(outcome.achievement_unlocked, None);
    }

    #[tokio::test]
    async fn test_second_quiz_same_day_keeps_streak() {
        let (store, user) = seeded_store(5, Some(day(2025, 3, 10))).await;
        let engine = StatsEngine::new(store);

        let outcome = engine
            .submit_quiz_at(&user, &quiz(1), at(2025, 3, 10))
            .await
            .unwrap();

        assert_eq!(outcome.stats.streak, 5);
    }

    #[tokio::test]
    async fn test_streak_resets_after_gap() {
        let (store, user) = seeded_store(10, Some(day(2025, 3, 7))).await;
        let engine = StatsEngine::new(store);

        let outcome = engine
            .submit_quiz_at(&user, &quiz(1), at(2025, 3, 10))
            .await
            .unwrap();

        assert_eq!(outcome.stats.streak, 1);
    }

    #[tokio::test]
    async fn test_xp_ignores_reported_score() {
        let (store, user) = seeded_store(0, None).await;
        let engine = StatsEngine::new(store.clone());

        let submission = QuizSubmission::new(500, 10, 5).unwrap();
        let outcome = engine
            .submit_quiz_at(&user, &submission, at(2025, 3, 10))
            .await
            .unwrap();

        assert_eq!(outcome.stats.xp, 500);
        assert_eq!(outcome.stats.level, 3);
        assert_eq!(outcome.stats.total_quizzes, 1);
        assert_eq!(outcome.stats.correct_answers, 5);
        assert_eq!(outcome.stats.streak, 1);
        assert_eq!(store.user_stats(&user).await.unwrap(), Some(outcome.stats));

        let attempts = store.attempts(&user).await;
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].score, 500);
        assert_eq!(attempts[0].total_questions, 10);
    }

    #[tokio::test]
    async fn test_level_tracks_xp_after_every_submission() {
        let (store, user) = seeded_store(0, None).await;
        let engine = StatsEngine::new(store);

        for (offset, correct) in [3, 7, 10, 0, 9, 4].into_iter().enumerate() {
            let now = at(2025, 4, 1) + chrono::Duration::days(offset as i64);
            let outcome = engine.submit_quiz_at(&user, &quiz(correct), now).await.unwrap();
            assert_eq!(outcome.stats.level, compute_level(outcome.stats.xp));
        }
    }

    #[tokio::test]
    async fn test_seven_day_streak_awarded_once() {
        let (store, user) = seeded_store(6, Some(day(2025, 3, 9))).await;
        let engine = StatsEngine::new(store.clone());

        let first = engine
            .submit_quiz_at(&user, &quiz(3), at(2025, 3, 10))
            .await
            .unwrap();
        assert_eq!(first.achievement_unlocked.as_deref(), Some("7_day_streak"));
        assert_eq!(first.stats.streak, 7);
        assert_eq!(first.stats.xp, 300 + STREAK_REWARD);
        assert_eq!(first.stats.level, compute_level(300 + STREAK_REWARD));

        let same_day = engine
            .submit_quiz_at(&user, &quiz(3), at(2025, 3, 10))
            .await
            .unwrap();
        assert_eq!(same_day.achievement_unlocked, None);
        assert_eq!(same_day.stats.xp, 600 + STREAK_REWARD);

        let next_day = engine
            .submit_quiz_at(&user, &quiz(1), at(2025, 3, 11))
            .await
            .unwrap();
        assert_eq!(next_day.achievement_unlocked, None);
        assert_eq!(next_day.stats.streak, 8);
        assert_eq!(next_day.stats.xp, 700 + STREAK_REWARD);

        assert_eq!(store.unlocked_achievements(&user).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_submissions_award_once() {
        let (store, user) = seeded_store(6, Some(day(2025, 3, 9))).await;
        let engine = Arc::new(StatsEngine::new(store.clone()));
        let now = at(2025, 3, 10);

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.submit_quiz_at(&user, &quiz(2), now).await })
            })
            .collect();

        let mut unlocked = 0;
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            if outcome.achievement_unlocked.is_some() {
                unlocked += 1;
            }
        }

        assert_eq!(unlocked, 1);

        let stats = store.user_stats(&user).await.unwrap().unwrap();
        assert_eq!(stats.xp, 400 + STREAK_REWARD);
        assert_eq!(stats.streak, 7);
        assert_eq!(stats.total_quizzes, 2);
        assert_eq!(store.unlocked_achievements(&user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rule_without_reference_row_is_skipped() {
        let store = MemoryStore::new();
        let user = UserId::new_v4();
        store
            .set_stats(UserStats {
                streak: 6,
                last_quiz_date: Some(day(2025, 3, 9)),
                ..UserStats::zeroed(user)
            })
            .await;
        let engine = StatsEngine::new(store.clone());

        let outcome = engine
            .submit_quiz_at(&user, &quiz(1), at(2025, 3, 10))
            .await
            .unwrap();

        assert_eq!(outcome.stats.streak, 7);
        assert_eq!(outcome.stats.xp, 100);
        assert_eq!(outcome.achievement_unlocked, None);
        assert!(store.unlocked_achievements(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let engine = StatsEngine::new(store.clone());
        let user = UserId::new_v4();

        let err = engine.submit_quiz(&user, &quiz(1)).await.unwrap_err();

        assert!(matches!(err, ProgressError::NotFound(id) if id == user));
        assert!(store.attempts(&user).await.is_empty());
    }

    #[tokio::test]
    async fn test_init_stats_only_once() {
        let store = MemoryStore::new();
        let engine = StatsEngine::new(store.clone());
        let user = UserId::new_v4();

        assert!(engine.init_stats(&user).await.unwrap());

        let mut stats = store.user_stats(&user).await.unwrap().unwrap();
        assert_eq!(stats, UserStats::zeroed(user));

        engine
            .submit_quiz_at(&user, &quiz(4), at(2025, 3, 10))
            .await
            .unwrap();
        assert!(!engine.init_stats(&user).await.unwrap());

        stats = store.user_stats(&user).await.unwrap().unwrap();
        assert_eq!(stats.xp, 400);
    }

    /// Store whose transactions fail on the final attempt insert
    struct FailingAttempts(MemoryStore);

    struct FailingTx(Box<dyn ProgressTx>);

    #[async_trait]
    impl ProgressStore for FailingAttempts {
        async fn begin(&self) -> DbResult<Box<dyn ProgressTx>> {
            Ok(Box::new(FailingTx(self.0.begin().await?)))
        }

        async fn user_stats(&self, user_id: &UserId) -> DbResult<Option<UserStats>> {
            self.0.user_stats(user_id).await
        }

        async fn user_rank(&self, user_id: &UserId) -> DbResult<Option<i64>> {
            self.0.user_rank(user_id).await
        }

        async fn top_ranked(&self, limit: i64) -> DbResult<Vec<RankedUser>> {
            self.0.top_ranked(limit).await
        }

        async fn unlocked_achievements(
            &self,
            user_id: &UserId,
        ) -> DbResult<Vec<UnlockedAchievement>> {
            self.0.unlocked_achievements(user_id).await
        }
    }

    #[async_trait]
    impl ProgressTx for FailingTx {
        async fn lock_stats(&mut self, user_id: &UserId) -> DbResult<Option<UserStats>> {
            self.0.lock_stats(user_id).await
        }

        async fn create_stats(&mut self, stats: &UserStats) -> DbResult<bool> {
            self.0.create_stats(stats).await
        }

        async fn apply_quiz(
            &mut self,
            user_id: &UserId,
            delta: &QuizDelta,
        ) -> DbResult<UserStats> {
            self.0.apply_quiz(user_id, delta).await
        }

        async fn set_level(&mut self, user_id: &UserId, level: i32) -> DbResult<UserStats> {
            self.0.set_level(user_id, level).await
        }

        async fn add_xp(&mut self, user_id: &UserId, amount: i64) -> DbResult<UserStats> {
            self.0.add_xp(user_id, amount).await
        }

        async fn achievement_by_key(&mut self, key: &str) -> DbResult<Option<Achievement>> {
            self.0.achievement_by_key(key).await
        }

        async fn insert_unlock(
            &mut self,
            user_id: &UserId,
            achievement: &Achievement,
            unlocked_at: DateTime<Utc>,
        ) -> DbResult<bool> {
            self.0.insert_unlock(user_id, achievement, unlocked_at).await
        }

        async fn insert_attempt(
            &mut self,
            _user_id: &UserId,
            _submission: &QuizSubmission,
            _created_at: DateTime<Utc>,
        ) -> DbResult<QuizAttempt> {
            Err(DbError::SqlxError(sqlx::Error::Protocol(
                "attempt insert rejected".to_string(),
            )))
        }

        async fn commit(self: Box<Self>) -> DbResult<()> {
            let Self(inner) = *self;
            inner.commit().await
        }

        async fn rollback(self: Box<Self>) -> DbResult<()> {
            let Self(inner) = *self;
            inner.rollback().await
        }
    }

    #[tokio::test]
    async fn test_failed_attempt_insert_rolls_back() {
        let (store, user) = seeded_store(6, Some(day(2025, 3, 9))).await;
        let before = store.user_stats(&user).await.unwrap().unwrap();
        let engine = StatsEngine::new(FailingAttempts(store.clone()));

        let err = engine
            .submit_quiz_at(&user, &quiz(5), at(2025, 3, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::Transaction(_)));

        let after = store.user_stats(&user).await.unwrap().unwrap();
        assert_eq!(after, before);
        assert!(store.attempts(&user).await.is_empty());
        assert!(store.unlocked_achievements(&user).await.unwrap().is_empty());
    }
}
