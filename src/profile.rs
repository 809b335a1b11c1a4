use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::db::DbResult;
use crate::db::prelude::{ProgressStore, UnlockedAchievement, UserId, UserStats};

/// Everything the profile page shows about a user's progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    /// `None` until the stats row is created at registration
    pub stats: Option<UserStats>,
    pub rank: Option<i64>,
    pub achievements: Vec<UnlockedAchievement>,
}

pub struct ProfileService<S> {
    store: S,
}

impl<S: ProgressStore> ProfileService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, user_id), fields(%user_id))]
    pub async fn progress(&self, user_id: &UserId) -> DbResult<ProgressSummary> {
        let stats = self.store.user_stats(user_id).await?;
        let rank = self.store.user_rank(user_id).await?;
        let achievements = self.store.unlocked_achievements(user_id).await?;

        Ok(ProgressSummary {
            stats,
            rank,
            achievements,
        })
    }
}

#[cfg(test)]
mod test {
    use chrono::{NaiveDate, TimeZone, Utc};

    use super::*;
    use crate::db::prelude::{MemoryStore, QuizSubmission, Role};
    use crate::progress::StatsEngine;

    #[tokio::test]
    async fn test_summary_lists_streak_achievement() {
        let store = MemoryStore::new();
        let user = UserId::new_v4();
        store.insert_user(user, "ana", None, Role::User).await;
        store.insert_achievement("7_day_streak", "Week on fire", 250).await;
        store
            .set_stats(UserStats {
                streak: 6,
                last_quiz_date: NaiveDate::from_ymd_opt(2025, 6, 1),
                ..UserStats::zeroed(user)
            })
            .await;

        let now = Utc.with_ymd_and_hms(2025, 6, 2, 8, 30, 0).unwrap();
        let submission = QuizSubmission::new(4, 5, 4).unwrap();
        StatsEngine::new(store.clone())
            .submit_quiz_at(&user, &submission, now)
            .await
            .unwrap();

        let summary = ProfileService::new(store).progress(&user).await.unwrap();

        assert_eq!(summary.rank, Some(1));
        assert_eq!(summary.stats.map(|s| s.xp), Some(650));
        assert_eq!(summary.achievements.len(), 1);
        assert_eq!(summary.achievements[0].key, "7_day_streak");
        assert_eq!(summary.achievements[0].unlocked_at, now);
    }

    #[tokio::test]
    async fn test_summary_for_unknown_user() {
        let summary = ProfileService::new(MemoryStore::new())
            .progress(&UserId::new_v4())
            .await
            .unwrap();

        assert_eq!(summary.stats, None);
        assert_eq!(summary.rank, None);
        assert!(summary.achievements.is_empty());
    }
}
