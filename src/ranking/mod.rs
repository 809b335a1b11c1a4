//! Leaderboard ranking over ranked accounts.
//!
//! Accounts are ordered by `(xp desc, streak desc)` with standard competition ranking, so tied
//! accounts share a rank. Ranks are recomputed from the stats table on every call.

mod order;
mod placeholders;

pub use order::{competition_ranks, rank_key, rank_users};
pub use placeholders::{PLACEHOLDERS, Placeholder, pad_leaderboard};

use tracing::instrument;

use crate::db::DbResult;
use crate::db::prelude::{LeaderboardEntry, ProgressStore, UserId};

pub struct RankingService<S> {
    store: S,
}

impl<S: ProgressStore> RankingService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// `Ok(None)` when the user has no stats row or holds an unranked role
    #[instrument(skip(self, user_id), fields(%user_id))]
    pub async fn user_rank(&self, user_id: &UserId) -> DbResult<Option<i64>> {
        self.store.user_rank(user_id).await
    }

    /// Top `limit` real accounts, padded with placeholder entries when there are fewer
    #[instrument(skip(self))]
    pub async fn leaderboard(&self, limit: u32) -> DbResult<Vec<LeaderboardEntry>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let real: Vec<LeaderboardEntry> = self
            .store
            .top_ranked(i64::from(limit))
            .await?
            .into_iter()
            .map(LeaderboardEntry::from)
            .collect();

        let real_count = real.len();
        let board = pad_leaderboard(real, limit as usize);

        tracing::debug!(
            real = real_count,
            padded = board.len() - real_count,
            "built leaderboard"
        );

        Ok(board)
    }
}
