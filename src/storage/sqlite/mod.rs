//! `SQLite` storage backend.
//!
//! ## Module Structure
//!
//! - `connection`: pragma setup and driver error mapping
//! - `schema`: versioned migrations tracked in `PRAGMA user_version`
//! - `sql`: statement text and LIKE escaping
//! - `rows`: row decoding
//!
//! Pagination and the leaderboard join run in SQL. The ordering clauses match
//! the comparators the in-process backends use. Aggregates are folded by
//! [`aggregate_stats`] so every backend sums times identically.

mod connection;
mod rows;
mod schema;
mod sql;

pub use connection::{BUSY_TIMEOUT, configure_connection, map_sqlite_error};
pub use schema::{MIGRATIONS, Migration, current_version, migrate};
pub use sql::escape_like_wildcards;

use super::clock::MonotonicClock;
use super::lock::acquire_lock;
use super::metrics::timed;
use super::ranking::aggregate_stats;
use super::traits::{Committed, StorageBackend};
use crate::models::{
    Difficulty, LeaderboardEntry, NewScore, Page, PageRequest, Score, ScoreId, ScoreStats, User,
    UserId,
};
use crate::{Error, Result};
use chrono::DateTime;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::instrument;

const BACKEND: &str = "sqlite";

/// `SQLite`-backed storage.
///
/// # Concurrency Model
///
/// Uses a `Mutex<Connection>` for thread-safe access, so statements from one
/// process are serialized. WAL mode and `busy_timeout` keep other processes
/// sharing the file from failing on lock contention.
///
/// # Integrity
///
/// `username` is `UNIQUE`, `scores.user_id` references `users(id)` with
/// `ON DELETE CASCADE`, and `foreign_keys` is enabled on every connection.
#[derive(Debug)]
pub struct SqliteBackend {
    /// Protected by Mutex because `rusqlite::Connection` is not `Sync`.
    conn: Mutex<Connection>,
    /// Path to the database file (None for in-memory).
    db_path: Option<PathBuf>,
    clock: MonotonicClock,
}

impl SqliteBackend {
    /// Opens (or creates) a database file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the file cannot be opened or migrated.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// use focusgrid::storage::SqliteBackend;
    ///
    /// let backend = SqliteBackend::new("./focusgrid.db")?;
    /// # Ok::<(), focusgrid::Error>(())
    /// ```
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::storage("create_data_dir", e))?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::storage("open_sqlite", e))?;
        let backend = Self::initialize(conn, Some(db_path))?;
        tracing::info!(path = ?backend.db_path, "opened sqlite storage");
        Ok(backend)
    }

    /// Creates a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::storage("open_sqlite_in_memory", e))?;
        Self::initialize(conn, None)
    }

    /// Returns the database path (None for in-memory).
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn initialize(mut conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        configure_connection(&conn)?;
        migrate(&mut conn, MIGRATIONS)?;

        let latest: Option<i64> = conn
            .query_row(sql::LATEST_CREATED_AT, [], |row| row.get(0))
            .map_err(|e| Error::storage("read_latest_timestamp", e))?;
        let clock = MonotonicClock::resuming_after(latest.and_then(DateTime::from_timestamp_micros));

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            clock,
        })
    }
}

impl StorageBackend for SqliteBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, password_hash), fields(backend = BACKEND))]
    fn create_user(&self, username: &str, password_hash: &str) -> Result<Committed<User>> {
        timed(BACKEND, "create_user", || {
            let conn = acquire_lock(&self.conn);
            let user = User {
                id: UserId::generate(),
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                created_at: self.clock.now(),
            };
            conn.execute(
                sql::INSERT_USER,
                params![
                    user.id.as_str(),
                    user.username,
                    user.password_hash,
                    rows::to_micros(user.created_at)
                ],
            )
            .map_err(|e| map_sqlite_error("create_user", username, e))?;
            Ok(Committed::durable(user))
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        timed(BACKEND, "find_user_by_username", || {
            let conn = acquire_lock(&self.conn);
            conn.query_row(sql::SELECT_USER_BY_USERNAME, [username], rows::user_from_row)
                .optional()
                .map_err(|e| Error::storage("find_user_by_username", e))
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
        timed(BACKEND, "find_user_by_id", || {
            let conn = acquire_lock(&self.conn);
            conn.query_row(sql::SELECT_USER_BY_ID, [id.as_str()], rows::user_from_row)
                .optional()
                .map_err(|e| Error::storage("find_user_by_id", e))
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn list_users(&self, request: PageRequest, search: &str) -> Result<Page<User>> {
        timed(BACKEND, "list_users", || {
            let map_err = |e: rusqlite::Error| Error::storage("list_users", e);
            let pattern = sql::contains_pattern(search);
            let limit = i64::try_from(request.page_size()).unwrap_or(i64::MAX);
            let offset = i64::try_from(request.offset()).unwrap_or(i64::MAX);

            let mut conn = acquire_lock(&self.conn);
            // COUNT and page come from one read snapshot.
            let tx = conn.transaction().map_err(map_err)?;
            let total: i64 = tx
                .query_row(sql::COUNT_USERS_MATCHING, params![search, pattern], |row| {
                    row.get(0)
                })
                .map_err(map_err)?;
            let items = {
                let mut stmt = tx.prepare(sql::SELECT_USERS_PAGE).map_err(map_err)?;
                stmt.query_map(
                    params![search, pattern, limit, offset],
                    rows::user_from_row,
                )
                .and_then(Iterator::collect::<rusqlite::Result<Vec<_>>>)
                .map_err(map_err)?
            };
            tx.commit().map_err(map_err)?;

            Ok(Page {
                items,
                total: u64::try_from(total).unwrap_or_default(),
                page: request.page(),
                page_size: request.page_size(),
            })
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn delete_user(&self, id: &UserId) -> Result<Committed<()>> {
        timed(BACKEND, "delete_user", || {
            let conn = acquire_lock(&self.conn);
            let removed = conn
                .execute(sql::DELETE_USER, [id.as_str()])
                .map_err(|e| Error::storage("delete_user", e))?;
            if removed == 0 {
                return Err(Error::NotFound {
                    entity: "user",
                    id: id.to_string(),
                });
            }
            tracing::debug!(user_id = %id, "deleted user");
            Ok(Committed::durable(()))
        })
    }

    fn count_users(&self) -> Result<u64> {
        timed(BACKEND, "count_users", || self.count(sql::COUNT_USERS, "count_users"))
    }

    #[instrument(skip(self, score), fields(backend = BACKEND, user_id = %score.user_id))]
    fn create_score(&self, score: NewScore) -> Result<Committed<Score>> {
        timed(BACKEND, "create_score", || {
            score.check_time()?;
            let conn = acquire_lock(&self.conn);
            let score = score.into_score(ScoreId::generate(), self.clock.now());
            conn.execute(
                sql::INSERT_SCORE,
                params![
                    score.id.as_str(),
                    score.user_id.as_str(),
                    score.game_type,
                    i64::from(score.score),
                    score.time,
                    score.difficulty.as_str(),
                    rows::to_micros(score.created_at)
                ],
            )
            .map_err(|e| map_sqlite_error("create_score", score.user_id.as_str(), e))?;
            Ok(Committed::durable(score))
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
            let map_err = |e: rusqlite::Error| Error::storage("leaderboard", e);
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn.prepare(sql::SELECT_LEADERBOARD).map_err(map_err)?;
            stmt.query_map(
                params![game_type, difficulty.as_str(), limit],
                rows::entry_from_row,
            )
            .and_then(Iterator::collect)
            .map_err(map_err)
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
            let map_err = |e: rusqlite::Error| Error::storage("user_scores", e);
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn.prepare(sql::SELECT_USER_SCORES).map_err(map_err)?;
            stmt.query_map(
                params![user_id.as_str(), game_type, difficulty.as_str()],
                rows::score_from_row,
            )
            .and_then(Iterator::collect)
            .map_err(map_err)
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn score_stats(&self) -> Result<Vec<ScoreStats>> {
        timed(BACKEND, "score_stats", || {
            let map_err = |e: rusqlite::Error| Error::storage("score_stats", e);
            let conn = acquire_lock(&self.conn);
            let mut stmt = conn.prepare(sql::SELECT_ALL_SCORES).map_err(map_err)?;
            let scores: Vec<Score> = stmt
                .query_map([], rows::score_from_row)
                .and_then(Iterator::collect)
                .map_err(map_err)?;
            Ok(aggregate_stats(&scores))
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn delete_score(&self, id: &ScoreId) -> Result<Committed<()>> {
        timed(BACKEND, "delete_score", || {
            let conn = acquire_lock(&self.conn);
            let removed = conn
                .execute(sql::DELETE_SCORE, [id.as_str()])
                .map_err(|e| Error::storage("delete_score", e))?;
            if removed == 0 {
                return Err(Error::NotFound {
                    entity: "score",
                    id: id.to_string(),
                });
            }
            Ok(Committed::durable(()))
        })
    }

    fn count_scores(&self) -> Result<u64> {
        timed(BACKEND, "count_scores", || {
            self.count(sql::COUNT_SCORES, "count_scores")
        })
    }
}

impl SqliteBackend {
    fn count(&self, query: &str, operation: &'static str) -> Result<u64> {
        let conn = acquire_lock(&self.conn);
        let n: i64 = conn
            .query_row(query, [], |row| row.get(0))
            .map_err(|e| Error::storage(operation, e))?;
        Ok(u64::try_from(n).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user(backend: &SqliteBackend, name: &str) -> User {
        backend.create_user(name, "hash").unwrap().into_inner()
    }

    #[test]
    fn test_duplicate_username_maps_to_contract_error() {
        let backend = SqliteBackend::in_memory().unwrap();
        user(&backend, "ada");
        let err = backend.create_user("ada", "other").unwrap_err();
        assert!(matches!(err, Error::DuplicateUsername(ref name) if name == "ada"));
    }

    #[test]
    fn test_unknown_user_maps_to_invalid_reference() {
        let backend = SqliteBackend::in_memory().unwrap();
        let err = backend
            .create_score(NewScore::new(UserId::new("ghost"), "g", 1, 3.0, Difficulty::Easy))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidReference(ref id) if id == "ghost"));
    }

    #[test]
    fn test_cascade_delete() {
        let backend = SqliteBackend::in_memory().unwrap();
        let ada = user(&backend, "ada");
        let grace = user(&backend, "grace");
        for (owner, time) in [(&ada, 3.0), (&ada, 4.0), (&grace, 5.0)] {
            backend
                .create_score(NewScore::new(owner.id.clone(), "g", 1, time, Difficulty::Easy))
                .unwrap();
        }

        backend.delete_user(&ada.id).unwrap();
        assert_eq!(backend.count_scores().unwrap(), 1);
        assert!(
            backend
                .user_scores(&ada.id, "g", Difficulty::Easy)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let backend = SqliteBackend::in_memory().unwrap();
        user(&backend, "a_b");
        user(&backend, "axb");

        let page = backend.list_users(PageRequest::new(1, 10), "a_").unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].username, "a_b");

        let page = backend.list_users(PageRequest::new(1, 10), "AX").unwrap();
        assert_eq!(page.items[0].username, "axb");
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("focusgrid.db");

        let backend = SqliteBackend::new(&path).unwrap();
        let ada = user(&backend, "ada");
        drop(backend);

        let reopened = SqliteBackend::new(&path).unwrap();
        assert_eq!(reopened.db_path(), Some(path.as_path()));
        let found = reopened.find_user_by_id(&ada.id).unwrap().unwrap();
        assert_eq!(found, ada);

        let later = user(&reopened, "grace");
        assert!(later.created_at > ada.created_at);
    }

    #[test]
    fn test_rejects_invalid_time() {
        let backend = SqliteBackend::in_memory().unwrap();
        let ada = user(&backend, "ada");
        let err = backend
            .create_score(NewScore::new(ada.id, "g", 1, -2.0, Difficulty::Easy))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
