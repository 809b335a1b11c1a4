use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tracing::instrument;

use crate::util::env::Config;

pub mod memory;
pub mod models;
pub mod repositories;

pub mod prelude {
    pub use crate::db::models::achievement::{Achievement, UnlockedAchievement};
    pub use crate::db::models::leaderboard::{LeaderboardEntry, RankedUser};
    pub use crate::db::models::stats::{
        QuizAttempt, QuizDelta, QuizSubmission, Role, SubmissionError, UserId, UserStats,
    };
    pub use crate::db::{Db, DbError, DbResult};

    pub use crate::db::memory::MemoryStore;
    pub use crate::db::repositories::{PgStore, ProgressStore, ProgressTx};
}

pub use repositories::{PgStore, ProgressStore, ProgressTx};

/// Owner of the process' connection pool.
///
/// Constructed once at startup and handed to whatever needs a store; there is no global pool.
#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
}

impl Db {
    #[instrument(skip(config), fields(max_connections = config.database_max_connections))]
    pub async fn connect(config: &Config) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;

        tracing::debug!("database pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

pub type DbResult<T> = core::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),

    #[error("transaction already completed")]
    TxCompleted,
}
