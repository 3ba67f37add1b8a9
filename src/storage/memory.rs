//! In-memory storage backend.
//!
//! Holds every record in hash maps behind a single [`RwLock`]. Nothing
//! survives the process; the file backend layers snapshots on top of it.

use super::clock::MonotonicClock;
use super::lock::{read_lock, write_lock};
use super::metrics::timed;
use super::ranking::{aggregate_stats, leaderboard_order, newest_score_first, newest_user_first};
use super::traits::{Committed, StorageBackend};
use crate::models::{
    Difficulty, LeaderboardEntry, NewScore, Page, PageRequest, Score, ScoreId, ScoreStats, User,
    UserId,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::instrument;

const BACKEND: &str = "memory";

/// The record maps plus a mutation counter.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) users: HashMap<UserId, User>,
    pub(crate) scores: HashMap<ScoreId, Score>,
    usernames: HashMap<String, UserId>,
    generation: u64,
}

impl Tables {
    /// Builds tables from loaded records.
    ///
    /// When two users share a username the earlier registration wins and the
    /// later one is dropped with a warning.
    pub(crate) fn from_records(mut users: Vec<User>, scores: Vec<Score>) -> Self {
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let mut tables = Self::default();
        for user in users {
            if tables.usernames.contains_key(&user.username) {
                tracing::warn!(
                    username = %user.username,
                    user_id = %user.id,
                    "dropping stored user with duplicate username"
                );
                continue;
            }
            tables.usernames.insert(user.username.clone(), user.id.clone());
            tables.users.insert(user.id.clone(), user);
        }
        tables.scores = scores.into_iter().map(|s| (s.id.clone(), s)).collect();
        tables
    }

    /// Returns the number of mutations applied since construction.
    pub(crate) const fn generation(&self) -> u64 {
        self.generation
    }

    fn latest_created_at(&self) -> Option<DateTime<Utc>> {
        let users = self.users.values().map(|u| u.created_at);
        let scores = self.scores.values().map(|s| s.created_at);
        users.chain(scores).max()
    }

    const fn bump(&mut self) {
        self.generation += 1;
    }
}

/// Volatile storage backend.
///
/// # Example
///
/// ```rust
/// use focusgrid::storage::{MemoryBackend, StorageBackend};
///
/// let store = MemoryBackend::new();
/// store.create_user("grace", "$argon2id$digest")?;
/// assert_eq!(store.count_users()?, 1);
/// # Ok::<(), focusgrid::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    clock: MonotonicClock,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps loaded tables. The clock resumes after the newest record.
    pub(crate) fn from_tables(tables: Tables) -> Self {
        let clock = MonotonicClock::resuming_after(tables.latest_created_at());
        Self {
            tables: RwLock::new(tables),
            clock,
        }
    }

    /// Runs `f` under the shared read guard.
    pub(crate) fn with_tables<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&read_lock(&self.tables))
    }

    pub(crate) fn insert_user(&self, username: &str, password_hash: &str) -> Result<User> {
        let mut tables = write_lock(&self.tables);
        if tables.usernames.contains_key(username) {
            return Err(Error::DuplicateUsername(username.to_string()));
        }

        let user = User {
            id: UserId::generate(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: self.clock.now(),
        };
        tables.usernames.insert(user.username.clone(), user.id.clone());
        tables.users.insert(user.id.clone(), user.clone());
        tables.bump();
        Ok(user)
    }

    pub(crate) fn user_by_name(&self, username: &str) -> Option<User> {
        let tables = read_lock(&self.tables);
        tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned()
    }

    pub(crate) fn user_by_id(&self, id: &UserId) -> Option<User> {
        read_lock(&self.tables).users.get(id).cloned()
    }

    pub(crate) fn users_page(&self, request: PageRequest, search: &str) -> Page<User> {
        let tables = read_lock(&self.tables);
        let mut matching: Vec<&User> = tables
            .users
            .values()
            .filter(|u| u.username_contains(search))
            .collect();
        matching.sort_by(|a, b| newest_user_first(a, b));
        Page::slice(matching, request).map(User::clone)
    }

    pub(crate) fn remove_user(&self, id: &UserId) -> Result<()> {
        let mut tables = write_lock(&self.tables);
        let Some(user) = tables.users.remove(id) else {
            return Err(Error::NotFound {
                entity: "user",
                id: id.to_string(),
            });
        };
        tables.usernames.remove(&user.username);
        let before = tables.scores.len();
        tables.scores.retain(|_, s| s.user_id != user.id);
        tables.bump();
        tracing::debug!(
            user_id = %id,
            scores_removed = before - tables.scores.len(),
            "deleted user"
        );
        Ok(())
    }

    pub(crate) fn insert_score(&self, new: NewScore) -> Result<Score> {
        new.check_time()?;
        let mut tables = write_lock(&self.tables);
        if !tables.users.contains_key(&new.user_id) {
            return Err(Error::InvalidReference(new.user_id.to_string()));
        }

        let score = new.into_score(ScoreId::generate(), self.clock.now());
        tables.scores.insert(score.id.clone(), score.clone());
        tables.bump();
        Ok(score)
    }

    pub(crate) fn ranked(
        &self,
        game_type: &str,
        difficulty: Difficulty,
        limit: usize,
    ) -> Vec<LeaderboardEntry> {
        if limit == 0 {
            return Vec::new();
        }
        let tables = read_lock(&self.tables);
        let mut candidates: Vec<(&Score, &User)> = tables
            .scores
            .values()
            .filter(|s| s.game_type == game_type && s.difficulty == difficulty)
            .filter_map(|s| tables.users.get(&s.user_id).map(|u| (s, u)))
            .collect();

        if candidates.len() > limit {
            candidates.select_nth_unstable_by(limit - 1, |a, b| leaderboard_order(a.0, b.0));
            candidates.truncate(limit);
        }
        candidates.sort_by(|a, b| leaderboard_order(a.0, b.0));

        candidates
            .into_iter()
            .map(|(score, user)| LeaderboardEntry {
                score: score.clone(),
                username: user.username.clone(),
            })
            .collect()
    }

    pub(crate) fn scores_of(
        &self,
        user_id: &UserId,
        game_type: &str,
        difficulty: Difficulty,
    ) -> Vec<Score> {
        let tables = read_lock(&self.tables);
        let mut scores: Vec<Score> = tables
            .scores
            .values()
            .filter(|s| {
                &s.user_id == user_id && s.game_type == game_type && s.difficulty == difficulty
            })
            .cloned()
            .collect();
        scores.sort_by(newest_score_first);
        scores
    }

    pub(crate) fn stats(&self) -> Vec<ScoreStats> {
        aggregate_stats(read_lock(&self.tables).scores.values())
    }

    pub(crate) fn remove_score(&self, id: &ScoreId) -> Result<()> {
        let mut tables = write_lock(&self.tables);
        if tables.scores.remove(id).is_none() {
            return Err(Error::NotFound {
                entity: "score",
                id: id.to_string(),
            });
        }
        tables.bump();
        Ok(())
    }

    pub(crate) fn user_count(&self) -> u64 {
        read_lock(&self.tables).users.len() as u64
    }

    pub(crate) fn score_count(&self) -> u64 {
        read_lock(&self.tables).scores.len() as u64
    }
}

impl StorageBackend for MemoryBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, password_hash), fields(backend = BACKEND))]
    fn create_user(&self, username: &str, password_hash: &str) -> Result<Committed<User>> {
        timed(BACKEND, "create_user", || {
            self.insert_user(username, password_hash)
                .map(Committed::durable)
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        timed(BACKEND, "find_user_by_username", || {
            Ok(self.user_by_name(username))
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
        timed(BACKEND, "find_user_by_id", || Ok(self.user_by_id(id)))
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn list_users(&self, request: PageRequest, search: &str) -> Result<Page<User>> {
        timed(BACKEND, "list_users", || Ok(self.users_page(request, search)))
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn delete_user(&self, id: &UserId) -> Result<Committed<()>> {
        timed(BACKEND, "delete_user", || {
            self.remove_user(id).map(Committed::durable)
        })
    }

    fn count_users(&self) -> Result<u64> {
        timed(BACKEND, "count_users", || Ok(self.user_count()))
    }

    #[instrument(skip(self, score), fields(backend = BACKEND, user_id = %score.user_id))]
    fn create_score(&self, score: NewScore) -> Result<Committed<Score>> {
        timed(BACKEND, "create_score", || {
            self.insert_score(score).map(Committed::durable)
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn leaderboard(
        &self,
        game_type: &str,
        difficulty: Difficulty,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>> {
        timed(BACKEND, "leaderboard", || {
            Ok(self.ranked(game_type, difficulty, limit))
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn user_scores(
        &self,
        user_id: &UserId,
        game_type: &str,
        difficulty: Difficulty,
    ) -> Result<Vec<Score>> {
        timed(BACKEND, "user_scores", || {
            Ok(self.scores_of(user_id, game_type, difficulty))
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn score_stats(&self) -> Result<Vec<ScoreStats>> {
        timed(BACKEND, "score_stats", || Ok(self.stats()))
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn delete_score(&self, id: &ScoreId) -> Result<Committed<()>> {
        timed(BACKEND, "delete_score", || {
            self.remove_score(id).map(Committed::durable)
        })
    }

    fn count_scores(&self) -> Result<u64> {
        timed(BACKEND, "count_scores", || Ok(self.score_count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (MemoryBackend, User) {
        let store = MemoryBackend::new();
        let user = store.create_user("ada", "hash").unwrap().into_inner();
        (store, user)
    }

    #[test]
    fn test_usernames_are_case_sensitive() {
        let (store, _) = seeded();
        assert!(store.create_user("ADA", "hash").is_ok());
        assert!(store.find_user_by_username("Ada").unwrap().is_none());
    }

    #[test]
    fn test_generation_counts_mutations() {
        let (store, user) = seeded();
        assert_eq!(store.with_tables(Tables::generation), 1);

        let score = store
            .create_score(NewScore::new(user.id.clone(), "g", 1, 2.0, Difficulty::Easy))
            .unwrap()
            .into_inner();
        store.delete_score(&score.id).unwrap();
        assert_eq!(store.with_tables(Tables::generation), 3);

        // Failed mutations leave the counter alone.
        assert!(store.delete_score(&score.id).is_err());
        assert!(store.create_user("ada", "hash").is_err());
        assert_eq!(store.with_tables(Tables::generation), 3);
    }

    #[test]
    fn test_invalid_time_is_rejected_before_lookup() {
        let store = MemoryBackend::new();
        let err = store
            .create_score(NewScore::new(UserId::new("nobody"), "g", 1, f64::NAN, Difficulty::Easy))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_leaderboard_skips_dangling_scores() {
        let (store, user) = seeded();
        store
            .create_score(NewScore::new(user.id.clone(), "g", 1, 5.0, Difficulty::Easy))
            .unwrap();

        let orphan = NewScore::new(UserId::new("ghost"), "g", 1, 1.0, Difficulty::Easy)
            .into_score(ScoreId::generate(), Utc::now());
        let mut tables = write_lock(&store.tables);
        tables.scores.insert(orphan.id.clone(), orphan);
        drop(tables);

        let board = store.leaderboard("g", Difficulty::Easy, 10).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].username, "ada");
    }

    #[test]
    fn test_leaderboard_zero_limit() {
        let (store, user) = seeded();
        store
            .create_score(NewScore::new(user.id, "g", 1, 5.0, Difficulty::Easy))
            .unwrap();
        assert!(store.leaderboard("g", Difficulty::Easy, 0).unwrap().is_empty());
    }

    #[test]
    fn test_from_records_keeps_earliest_duplicate() {
        let early = User {
            id: UserId::new("b"),
            username: "dup".to_string(),
            password_hash: "h1".to_string(),
            created_at: DateTime::from_timestamp_micros(1_000).unwrap(),
        };
        let late = User {
            id: UserId::new("a"),
            created_at: DateTime::from_timestamp_micros(2_000).unwrap(),
            password_hash: "h2".to_string(),
            ..early.clone()
        };

        let store = MemoryBackend::from_tables(Tables::from_records(vec![late, early], Vec::new()));
        let found = store.find_user_by_username("dup").unwrap().unwrap();
        assert_eq!(found.id.as_str(), "b");
        assert_eq!(store.count_users().unwrap(), 1);
    }

    #[test]
    fn test_clock_resumes_after_loaded_records() {
        let future = Utc::now() + chrono::Duration::hours(2);
        let loaded = User {
            id: UserId::new("x"),
            username: "future".to_string(),
            password_hash: "h".to_string(),
            created_at: future,
        };
        let store = MemoryBackend::from_tables(Tables::from_records(vec![loaded], Vec::new()));
        let fresh = store.create_user("now", "h").unwrap().into_inner();
        assert!(fresh.created_at > future);
    }
}
