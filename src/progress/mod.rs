//! Per-user progress: xp, levels, daily streaks and streak achievements.
//!
//! Every quiz submission goes through [`StatsEngine`], which applies the whole update inside a
//! single store transaction with the user's stats row locked.

mod achievements;
mod engine;
mod level;
mod streak;

pub use achievements::{ACHIEVEMENT_RULES, AchievementRule};
pub use engine::{ProgressError, ProgressResult, QuizOutcome, StatsEngine};
pub use level::{compute_level, xp_for_level};
pub use streak::next_streak;
