use serde::{Deserialize, Serialize};

use super::stats::UserId;

/// A ranked account as produced by the ranking query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RankedUser {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar: Option<String>,
    pub xp: i64,
    pub level: i32,
    pub streak: i32,
    pub rank: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// `None` for placeholder rows
    pub user_id: Option<UserId>,
    pub display_name: String,
    pub avatar: Option<String>,
    pub xp: i64,
    pub level: i32,
    pub streak: i32,
    pub rank: i64,
    pub is_placeholder: bool,
}

impl From<RankedUser> for LeaderboardEntry {
    fn from(value: RankedUser) -> Self {
        Self {
            user_id: Some(value.user_id),
            display_name: value.display_name,
            avatar: value.avatar,
            xp: value.xp,
            level: value.level,
            streak: value.streak,
            rank: value.rank,
            is_placeholder: false,
        }
    }
}
