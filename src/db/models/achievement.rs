use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `achievements` reference table model, seeded outside this crate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Achievement {
    pub id: i32,
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub xp_reward: i64,
}

/// An achievement joined with the time a user unlocked it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UnlockedAchievement {
    pub key: String,
    pub name: String,
    pub description: Option<String>,
    pub xp_reward: i64,
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockedAchievement {
    pub fn new(achievement: &Achievement, unlocked_at: DateTime<Utc>) -> Self {
        Self {
            key: achievement.key.clone(),
            name: achievement.name.clone(),
            description: achievement.description.clone(),
            xp_reward: achievement.xp_reward,
            unlocked_at,
        }
    }
}
