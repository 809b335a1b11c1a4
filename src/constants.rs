/// Xp awarded for every correctly answered quiz question
pub const XP_PER_CORRECT_ANSWER: i64 = 100;

/// Divisor in `level = floor(sqrt(xp / LEVEL_XP_DIVISOR)) + 1`
pub const LEVEL_XP_DIVISOR: i64 = 100;

pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Role column value of accounts that take part in the rankings
pub const RANKED_ROLE: &str = "user";

pub const SEVEN_DAY_STREAK: &str = "7_day_streak";
pub const SEVEN_DAY_STREAK_THRESHOLD: i32 = 7;
