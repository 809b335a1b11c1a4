use std::cmp::Reverse;

use crate::db::prelude::RankedUser;

/// Position key: higher xp first, then the longer streak.
pub fn rank_key(xp: i64, streak: i32) -> (Reverse<i64>, Reverse<i32>) {
    (Reverse(xp), Reverse(streak))
}

/// Standard competition ("1224") ranking over keys that are already in rank order.
///
/// Equal keys share the rank of the first of them, and the next distinct key is ranked by its
/// position, so a two-way tie for first is followed by rank 3.
pub fn competition_ranks<K: PartialEq>(sorted_keys: &[K]) -> Vec<i64> {
    let mut ranks: Vec<i64> = Vec::with_capacity(sorted_keys.len());

    for (idx, key) in sorted_keys.iter().enumerate() {
        let rank = match ranks.last() {
            Some(&prev) if sorted_keys[idx - 1] == *key => prev,
            _ => idx as i64 + 1,
        };
        ranks.push(rank);
    }

    ranks
}

/// Sorts users into leaderboard order and fills in their `rank`.
///
/// Ties are listed by display name, which only affects order, never the rank number.
pub fn rank_users(mut users: Vec<RankedUser>) -> Vec<RankedUser> {
    users.sort_by(|a, b| {
        rank_key(a.xp, a.streak)
            .cmp(&rank_key(b.xp, b.streak))
            .then_with(|| a.display_name.cmp(&b.display_name))
    });

    let keys: Vec<_> = users.iter().map(|u| rank_key(u.xp, u.streak)).collect();
    for (user, rank) in users.iter_mut().zip(competition_ranks(&keys)) {
        user.rank = rank;
    }

    users
}
