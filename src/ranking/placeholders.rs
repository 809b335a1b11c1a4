use crate::db::prelude::LeaderboardEntry;

/// Decorative account shown at the tail of a short leaderboard
#[derive(Debug, Clone, Copy)]
pub struct Placeholder {
    pub display_name: &'static str,
    pub avatar: &'static str,
    pub xp: i64,
    pub level: i32,
    pub streak: i32,
}

impl Placeholder {
    pub fn to_entry(&self, rank: i64) -> LeaderboardEntry {
        LeaderboardEntry {
            user_id: None,
            display_name: self.display_name.to_string(),
            avatar: Some(self.avatar.to_string()),
            xp: self.xp,
            level: self.level,
            streak: self.streak,
            rank,
            is_placeholder: true,
        }
    }
}

const fn placeholder(
    display_name: &'static str,
    avatar: &'static str,
    xp: i64,
    level: i32,
    streak: i32,
) -> Placeholder {
    Placeholder {
        display_name,
        avatar,
        xp,
        level,
        streak,
    }
}

/// Padding roster, in the order it is appended
pub static PLACEHOLDERS: &[Placeholder] = &[
    placeholder("Ardit Kola", "eagle.png", 2800, 6, 5),
    placeholder("Elira Hoxha", "cat.png", 2400, 5, 4),
    placeholder("Besnik Krasniqi", "bear.png", 2100, 5, 3),
    placeholder("Jona Dervishi", "panda.png", 1800, 5, 6),
    placeholder("Ermal Gashi", "robot.png", 1500, 4, 2),
    placeholder("Klea Meta", "penguin.png", 1200, 4, 3),
    placeholder("Lorik Shala", "lion.png", 900, 4, 1),
    placeholder("Rina Pasha", "parrot.png", 600, 3, 2),
    placeholder("Dion Leka", "rocket.png", 400, 3, 1),
    placeholder("Mira Gjoni", "book.png", 200, 2, 1),
];

/// Appends placeholders after `real` until the list holds `limit` entries or the roster runs
/// out. Placeholder ranks continue from the number of real entries.
pub fn pad_leaderboard(mut real: Vec<LeaderboardEntry>, limit: usize) -> Vec<LeaderboardEntry> {
    real.truncate(limit);

    let missing = limit - real.len();
    let start = real.len() as i64;
    real.extend(
        PLACEHOLDERS
            .iter()
            .take(missing)
            .enumerate()
            .map(|(idx, p)| p.to_entry(start + idx as i64 + 1)),
    );

    real
}
