//! In-process [`ProgressStore`] for tests and embedding.
//!
//! A transaction takes the store-wide lock and works on a copy of the state; commit swaps the
//! copy in, anything else throws it away. Writers are therefore fully serialized, which covers
//! the row lock a Postgres transaction takes on `user_stats`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::repositories::{ProgressStore, ProgressTx};
use super::{DbError, DbResult};
use crate::db::prelude::{
    Achievement, QuizAttempt, QuizDelta, QuizSubmission, RankedUser, Role, UnlockedAchievement,
    UserId, UserStats,
};
use crate::ranking::rank_users;

#[derive(Debug, Clone)]
struct MemoryUser {
    display_name: String,
    avatar: Option<String>,
    role: Role,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: HashMap<UserId, MemoryUser>,
    stats: HashMap<UserId, UserStats>,
    achievements: Vec<Achievement>,
    unlocks: HashMap<(UserId, i32), DateTime<Utc>>,
    attempts: Vec<QuizAttempt>,
}

impl MemoryState {
    fn ranked_users(&self) -> Vec<RankedUser> {
        let users = self
            .stats
            .values()
            .filter_map(|stats| {
                let user = self.users.get(&stats.user_id)?;
                user.role.is_ranked().then(|| RankedUser {
                    user_id: stats.user_id,
                    display_name: user.display_name.clone(),
                    avatar: user.avatar.clone(),
                    xp: stats.xp,
                    level: stats.level,
                    streak: stats.streak,
                    rank: 0,
                })
            })
            .collect();

        rank_users(users)
    }

    fn stats_mut(&mut self, user_id: &UserId) -> DbResult<&mut UserStats> {
        self.stats
            .get_mut(user_id)
            .ok_or(DbError::SqlxError(sqlx::Error::RowNotFound))
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account. Accounts without a stats row never show up in rankings.
    pub async fn insert_user(
        &self,
        user_id: UserId,
        display_name: &str,
        avatar: Option<&str>,
        role: Role,
    ) {
        let mut state = self.state.lock().await;
        state.users.insert(
            user_id,
            MemoryUser {
                display_name: display_name.to_string(),
                avatar: avatar.map(str::to_string),
                role,
            },
        );
    }

    /// Overwrites the stats row as-is
    pub async fn set_stats(&self, stats: UserStats) {
        let mut state = self.state.lock().await;
        state.stats.insert(stats.user_id, stats);
    }

    /// Seeds an `achievements` reference row; ids are assigned in insertion order from 1
    pub async fn insert_achievement(&self, key: &str, name: &str, xp_reward: i64) -> Achievement {
        let mut state = self.state.lock().await;
        let achievement = Achievement {
            id: state.achievements.len() as i32 + 1,
            key: key.to_string(),
            name: name.to_string(),
            description: None,
            xp_reward,
        };
        state.achievements.push(achievement.clone());
        achievement
    }

    pub async fn attempts(&self, user_id: &UserId) -> Vec<QuizAttempt> {
        let state = self.state.lock().await;
        state
            .attempts
            .iter()
            .filter(|a| a.user_id == *user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn begin(&self) -> DbResult<Box<dyn ProgressTx>> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(MemoryTx { guard, working }))
    }

    async fn user_stats(&self, user_id: &UserId) -> DbResult<Option<UserStats>> {
        Ok(self.state.lock().await.stats.get(user_id).cloned())
    }

    async fn user_rank(&self, user_id: &UserId) -> DbResult<Option<i64>> {
        let state = self.state.lock().await;
        let rank = state
            .ranked_users()
            .into_iter()
            .find(|u| u.user_id == *user_id)
            .map(|u| u.rank);

        Ok(rank)
    }

    async fn top_ranked(&self, limit: i64) -> DbResult<Vec<RankedUser>> {
        let state = self.state.lock().await;
        let mut users = state.ranked_users();
        users.truncate(usize::try_from(limit).unwrap_or(0));

        Ok(users)
    }

    async fn unlocked_achievements(
        &self,
        user_id: &UserId,
    ) -> DbResult<Vec<UnlockedAchievement>> {
        let state = self.state.lock().await;
        let mut unlocked: Vec<_> = state
            .achievements
            .iter()
            .filter_map(|a| {
                let at = state.unlocks.get(&(*user_id, a.id))?;
                Some(UnlockedAchievement::new(a, *at))
            })
            .collect();
        unlocked.sort_by(|a, b| {
            a.unlocked_at
                .cmp(&b.unlocked_at)
                .then_with(|| a.key.cmp(&b.key))
        });

        Ok(unlocked)
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl ProgressTx for MemoryTx {
    async fn lock_stats(&mut self, user_id: &UserId) -> DbResult<Option<UserStats>> {
        Ok(self.working.stats.get(user_id).cloned())
    }

    async fn create_stats(&mut self, stats: &UserStats) -> DbResult<bool> {
        if self.working.stats.contains_key(&stats.user_id) {
            return Ok(false);
        }
        self.working.stats.insert(stats.user_id, stats.clone());
        Ok(true)
    }

    async fn apply_quiz(&mut self, user_id: &UserId, delta: &QuizDelta) -> DbResult<UserStats> {
        let stats = self.working.stats_mut(user_id)?;
        stats.xp += delta.xp_gain;
        stats.total_quizzes += 1;
        stats.correct_answers += delta.correct_answers;
        stats.streak = delta.streak;
        stats.last_quiz_date = Some(delta.quiz_date);
        Ok(stats.clone())
    }

    async fn set_level(&mut self, user_id: &UserId, level: i32) -> DbResult<UserStats> {
        let stats = self.working.stats_mut(user_id)?;
        stats.level = level;
        Ok(stats.clone())
    }

    async fn add_xp(&mut self, user_id: &UserId, amount: i64) -> DbResult<UserStats> {
        let stats = self.working.stats_mut(user_id)?;
        stats.xp += amount;
        Ok(stats.clone())
    }

    async fn achievement_by_key(&mut self, key: &str) -> DbResult<Option<Achievement>> {
        Ok(self
            .working
            .achievements
            .iter()
            .find(|a| a.key == key)
            .cloned())
    }

    async fn insert_unlock(
        &mut self,
        user_id: &UserId,
        achievement: &Achievement,
        unlocked_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let key = (*user_id, achievement.id);
        if self.working.unlocks.contains_key(&key) {
            return Ok(false);
        }
        self.working.unlocks.insert(key, unlocked_at);
        Ok(true)
    }

    async fn insert_attempt(
        &mut self,
        user_id: &UserId,
        submission: &QuizSubmission,
        created_at: DateTime<Utc>,
    ) -> DbResult<QuizAttempt> {
        let attempt = QuizAttempt {
            id: self.working.attempts.len() as i64 + 1,
            user_id: *user_id,
            score: submission.score(),
            total_questions: submission.total_questions(),
            correct_answers: submission.correct_answers(),
            created_at,
        };
        self.working.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        Ok(())
    }
}
