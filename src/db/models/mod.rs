pub mod achievement;
pub mod leaderboard;
pub mod stats;
