use crate::constants::{SEVEN_DAY_STREAK, SEVEN_DAY_STREAK_THRESHOLD};
use crate::db::prelude::UserStats;

/// A server-side unlock condition.
///
/// The reward and display data live in the `achievements` table under the same key; a rule
/// whose key has no row there never fires.
#[derive(Debug, Clone, Copy)]
pub struct AchievementRule {
    pub key: &'static str,
    pub condition: fn(&UserStats) -> bool,
}

impl AchievementRule {
    pub fn is_met(&self, stats: &UserStats) -> bool {
        (self.condition)(stats)
    }
}

fn seven_day_streak(stats: &UserStats) -> bool {
    stats.streak >= SEVEN_DAY_STREAK_THRESHOLD
}

/// Rules checked after every quiz submission, in order
pub static ACHIEVEMENT_RULES: &[AchievementRule] = &[AchievementRule {
    key: SEVEN_DAY_STREAK,
    condition: seven_day_streak,
}];
