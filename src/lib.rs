//! Gamification and ranking engine for the Fjalingo dictionary quiz.
//!
//! [`progress::StatsEngine`] applies quiz submissions to a user's stats row (xp, level,
//! streak, counters) and awards one-time achievements. [`ranking::RankingService`] orders the
//! ranked accounts by xp and streak, and [`profile::ProfileService`] reads both back for a
//! single user. All of them work over a [`db::ProgressStore`], backed either by Postgres or by
//! the in-process [`db::memory::MemoryStore`].

pub mod constants;
pub mod db;
pub mod profile;
pub mod progress;
pub mod ranking;
pub mod util;
