use crate::constants::LEVEL_XP_DIVISOR;

/// Level for a given xp total: `floor(sqrt(xp / 100)) + 1`.
///
/// Evaluated in integers (`floor(sqrt(y)) == isqrt(floor(y))` for `y >= 0`). Negative xp counts
/// as zero.
pub fn compute_level(xp: i64) -> i32 {
    let root = (xp.max(0) / LEVEL_XP_DIVISOR).isqrt();
    i32::try_from(root + 1).unwrap_or(i32::MAX)
}

/// Least xp at which `level` is reached
pub fn xp_for_level(level: i32) -> i64 {
    let steps = i64::from(level.max(1) - 1);
    steps * steps * LEVEL_XP_DIVISOR
}
