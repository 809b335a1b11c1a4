use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use crate::db::DbResult;
use crate::db::prelude::{
    Achievement, QuizAttempt, QuizDelta, QuizSubmission, RankedUser, UnlockedAchievement, UserId,
    UserStats,
};

pub mod leaderboard;
pub mod tx;

pub use tx::PgTx;

/// Statements that make up a quiz submission, run inside one transaction.
///
/// Dropping an implementor without calling [`ProgressTx::commit`] must discard every write
/// made through it.
#[async_trait]
pub trait ProgressTx: Send {
    /// Reads the stats row and holds it against concurrent writers until commit/rollback
    async fn lock_stats(&mut self, user_id: &UserId) -> DbResult<Option<UserStats>>;

    /// Inserts the row unless one exists; `Ok(false)` means it was already there
    async fn create_stats(&mut self, stats: &UserStats) -> DbResult<bool>;

    async fn apply_quiz(&mut self, user_id: &UserId, delta: &QuizDelta) -> DbResult<UserStats>;
    async fn set_level(&mut self, user_id: &UserId, level: i32) -> DbResult<UserStats>;
    async fn add_xp(&mut self, user_id: &UserId, amount: i64) -> DbResult<UserStats>;

    async fn achievement_by_key(&mut self, key: &str) -> DbResult<Option<Achievement>>;

    /// Records the unlock unless the pair exists; only a `true` result may be rewarded
    async fn insert_unlock(
        &mut self,
        user_id: &UserId,
        achievement: &Achievement,
        unlocked_at: DateTime<Utc>,
    ) -> DbResult<bool>;

    async fn insert_attempt(
        &mut self,
        user_id: &UserId,
        submission: &QuizSubmission,
        created_at: DateTime<Utc>,
    ) -> DbResult<QuizAttempt>;

    async fn commit(self: Box<Self>) -> DbResult<()>;
    async fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// Storage behind the stats engine and the read services.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn begin(&self) -> DbResult<Box<dyn ProgressTx>>;

    async fn user_stats(&self, user_id: &UserId) -> DbResult<Option<UserStats>>;

    /// Competition rank among ranked accounts, `None` when the user is not ranked
    async fn user_rank(&self, user_id: &UserId) -> DbResult<Option<i64>>;

    /// Best `limit` ranked accounts, ordered by rank
    async fn top_ranked(&self, limit: i64) -> DbResult<Vec<RankedUser>>;

    async fn unlocked_achievements(&self, user_id: &UserId)
    -> DbResult<Vec<UnlockedAchievement>>;
}

pub mod sql_fragment {
    pub const STATS_FIELDS: &str = r#"
        user_id,
        xp,
        level,
        streak,
        last_quiz_date,
        total_quizzes,
        correct_answers
    "#;

    pub const ATTEMPT_FIELDS: &str = r#"
        id,
        user_id,
        score,
        total_questions,
        correct_answers,
        created_at
    "#;

    pub const ACHIEVEMENT_FIELDS: &str = r#"
        id,
        key,
        name,
        description,
        xp_reward
    "#;
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    #[instrument(skip(self))]
    async fn begin(&self) -> DbResult<Box<dyn ProgressTx>> {
        Ok(Box::new(PgTx::begin(&self.pool).await?))
    }

    #[instrument(skip(self, user_id), fields(%user_id))]
    async fn user_stats(&self, user_id: &UserId) -> DbResult<Option<UserStats>> {
        let stats = sqlx::query_as::<_, UserStats>(&format!(
            "SELECT {} FROM user_stats WHERE user_id = $1",
            sql_fragment::STATS_FIELDS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stats)
    }

    async fn user_rank(&self, user_id: &UserId) -> DbResult<Option<i64>> {
        leaderboard::user_rank(&self.pool, user_id).await
    }

    async fn top_ranked(&self, limit: i64) -> DbResult<Vec<RankedUser>> {
        leaderboard::top_ranked(&self.pool, limit).await
    }

    #[instrument(skip(self, user_id), fields(%user_id))]
    async fn unlocked_achievements(
        &self,
        user_id: &UserId,
    ) -> DbResult<Vec<UnlockedAchievement>> {
        let unlocked = sqlx::query_as::<_, UnlockedAchievement>(
            r#"
            SELECT
                a.key,
                a.name,
                a.description,
                a.xp_reward,
                ua.unlocked_at
            FROM user_achievements ua
            JOIN achievements a ON a.id = ua.achievement_id
            WHERE ua.user_id = $1
            ORDER BY ua.unlocked_at ASC, a.key ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(unlocked)
    }
}
