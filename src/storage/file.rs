//! JSON snapshot storage backend.
//!
//! Wraps a [`MemoryBackend`] and rewrites two sibling JSON documents after
//! every successful mutation:
//!
//! ```text
//! <data_dir>/
//! ├── users.json     { "<id>": { "id", "username", "passwordHash", "createdAt" } }
//! └── scores.json    { "<id>": { "id", "userId", "gameType", "score", "time", "difficulty", "createdAt" } }
//! ```
//!
//! Each document is written to a temporary file in the same directory, synced,
//! and renamed over the target, so a crash leaves either the old or the new
//! snapshot on disk and never a truncated one.

use super::lock::acquire_lock;
use super::memory::{MemoryBackend, Tables};
use super::metrics::{record_durability_warning, timed};
use super::traits::{Committed, DurabilityWarning, StorageBackend};
use crate::models::{
    Difficulty, LeaderboardEntry, NewScore, Page, PageRequest, Score, ScoreId, ScoreStats, User,
    UserId,
};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::instrument;

const BACKEND: &str = "file";

/// Default users document name.
pub const USERS_FILE: &str = "users.json";
/// Default scores document name.
pub const SCORES_FILE: &str = "scores.json";

/// On-disk form of a user.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    id: String,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<&User> for StoredUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            created_at: user.created_at,
        }
    }
}

impl StoredUser {
    fn into_user(self) -> User {
        User {
            id: UserId::new(self.id),
            username: self.username,
            password_hash: self.password_hash,
            created_at: truncate_to_micros(self.created_at),
        }
    }
}

/// On-disk form of a score.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredScore {
    id: String,
    user_id: String,
    game_type: String,
    score: u32,
    time: f64,
    difficulty: Difficulty,
    created_at: DateTime<Utc>,
}

impl From<&Score> for StoredScore {
    fn from(score: &Score) -> Self {
        Self {
            id: score.id.to_string(),
            user_id: score.user_id.to_string(),
            game_type: score.game_type.clone(),
            score: score.score,
            time: score.time,
            difficulty: score.difficulty,
            created_at: score.created_at,
        }
    }
}

impl StoredScore {
    fn into_score(self) -> Score {
        Score {
            id: ScoreId::new(self.id),
            user_id: UserId::new(self.user_id),
            game_type: self.game_type,
            score: self.score,
            time: self.time,
            difficulty: self.difficulty,
            created_at: truncate_to_micros(self.created_at),
        }
    }
}

fn truncate_to_micros(ts: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(ts.timestamp_micros()).unwrap_or(ts)
}

/// Serialized documents for one generation.
struct Staged {
    generation: u64,
    users: Vec<u8>,
    scores: Vec<u8>,
}

fn stage(tables: &Tables) -> serde_json::Result<Staged> {
    let users: BTreeMap<&str, StoredUser> = tables
        .users
        .values()
        .map(|u| (u.id.as_str(), StoredUser::from(u)))
        .collect();
    let scores: BTreeMap<&str, StoredScore> = tables
        .scores
        .values()
        .map(|s| (s.id.as_str(), StoredScore::from(s)))
        .collect();

    Ok(Staged {
        generation: tables.generation(),
        users: serde_json::to_vec_pretty(&users)?,
        scores: serde_json::to_vec_pretty(&scores)?,
    })
}

/// Writes `bytes` to `path` through a synced temporary file and a rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Loads one document. Missing, unreadable and unparsable documents all
/// load as empty; the last two are logged.
fn load_document<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read snapshot, starting empty");
            return Vec::new();
        },
    };

    match serde_json::from_str::<HashMap<String, T>>(&contents) {
        Ok(records) => records.into_values().collect(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot parse snapshot, starting empty");
            Vec::new()
        },
    }
}

/// Storage backend persisted as JSON snapshots.
///
/// Reads are served from memory. Mutations apply in memory first; the snapshot
/// write that follows runs outside the table lock, and a failure there is
/// reported as a [`DurabilityWarning`] on the returned [`Committed`] value.
#[derive(Debug)]
pub struct FileBackend {
    inner: MemoryBackend,
    users_path: PathBuf,
    scores_path: PathBuf,
    /// Generation of the newest snapshot on disk.
    persisted: Mutex<u64>,
}

impl FileBackend {
    /// Opens the backend, loading whatever snapshots exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the parent directories cannot be
    /// created. Damaged documents are not an error.
    pub fn new(users_path: impl Into<PathBuf>, scores_path: impl Into<PathBuf>) -> Result<Self> {
        let users_path = users_path.into();
        let scores_path = scores_path.into();

        for path in [&users_path, &scores_path] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| Error::storage("create_data_dir", e))?;
            }
        }

        let users = load_document::<StoredUser>(&users_path)
            .into_iter()
            .map(StoredUser::into_user)
            .collect();
        let scores = load_document::<StoredScore>(&scores_path)
            .into_iter()
            .map(StoredScore::into_score)
            .collect();
        let tables = Tables::from_records(users, scores);
        let persisted = tables.generation();

        tracing::info!(
            users_path = %users_path.display(),
            scores_path = %scores_path.display(),
            users = tables.users.len(),
            scores = tables.scores.len(),
            "opened file storage"
        );

        Ok(Self {
            inner: MemoryBackend::from_tables(tables),
            users_path,
            scores_path,
            persisted: Mutex::new(persisted),
        })
    }

    /// Opens the backend with the default document names inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if `dir` cannot be created.
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Self::new(dir.join(USERS_FILE), dir.join(SCORES_FILE))
    }

    /// Writes the current tables unless a newer or equal generation is on disk.
    fn persist(&self, operation: &'static str) -> Option<DurabilityWarning> {
        let mut persisted = acquire_lock(&self.persisted);

        let staged = self.inner.with_tables(|tables| {
            (tables.generation() > *persisted).then(|| stage(tables))
        });
        let staged = match staged {
            None => return None,
            Some(Ok(staged)) => staged,
            Some(Err(e)) => return Some(self.durability_warning(operation, &e)),
        };

        let written = write_atomic(&self.users_path, &staged.users)
            .and_then(|()| write_atomic(&self.scores_path, &staged.scores));
        match written {
            Ok(()) => {
                *persisted = staged.generation;
                tracing::debug!(generation = staged.generation, operation, "wrote snapshot");
                None
            },
            Err(e) => Some(self.durability_warning(operation, &e)),
        }
    }

    fn durability_warning(
        &self,
        operation: &'static str,
        cause: &dyn std::fmt::Display,
    ) -> DurabilityWarning {
        tracing::warn!(
            operation,
            users_path = %self.users_path.display(),
            error = %cause,
            "snapshot write failed, change is held in memory only"
        );
        record_durability_warning(BACKEND, operation);
        DurabilityWarning {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

impl StorageBackend for FileBackend {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    #[instrument(skip(self, password_hash), fields(backend = BACKEND))]
    fn create_user(&self, username: &str, password_hash: &str) -> Result<Committed<User>> {
        timed(BACKEND, "create_user", || {
            let user = self.inner.insert_user(username, password_hash)?;
            Ok(Committed::durable(user).with_warning(self.persist("create_user")))
        })
    }

    fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        timed(BACKEND, "find_user_by_username", || {
            Ok(self.inner.user_by_name(username))
        })
    }

    fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>> {
        timed(BACKEND, "find_user_by_id", || Ok(self.inner.user_by_id(id)))
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn list_users(&self, request: PageRequest, search: &str) -> Result<Page<User>> {
        timed(BACKEND, "list_users", || {
            Ok(self.inner.users_page(request, search))
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn delete_user(&self, id: &UserId) -> Result<Committed<()>> {
        timed(BACKEND, "delete_user", || {
            self.inner.remove_user(id)?;
            Ok(Committed::durable(()).with_warning(self.persist("delete_user")))
        })
    }

    fn count_users(&self) -> Result<u64> {
        timed(BACKEND, "count_users", || Ok(self.inner.user_count()))
    }

    #[instrument(skip(self, score), fields(backend = BACKEND, user_id = %score.user_id))]
    fn create_score(&self, score: NewScore) -> Result<Committed<Score>> {
        timed(BACKEND, "create_score", || {
            let score = self.inner.insert_score(score)?;
            Ok(Committed::durable(score).with_warning(self.persist("create_score")))
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
            Ok(self.inner.ranked(game_type, difficulty, limit))
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
            Ok(self.inner.scores_of(user_id, game_type, difficulty))
        })
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn score_stats(&self) -> Result<Vec<ScoreStats>> {
        timed(BACKEND, "score_stats", || Ok(self.inner.stats()))
    }

    #[instrument(skip(self), fields(backend = BACKEND))]
    fn delete_score(&self, id: &ScoreId) -> Result<Committed<()>> {
        timed(BACKEND, "delete_score", || {
            self.inner.remove_score(id)?;
            Ok(Committed::durable(()).with_warning(self.persist("delete_score")))
        })
    }

    fn count_scores(&self) -> Result<u64> {
        timed(BACKEND, "count_scores", || Ok(self.inner.score_count()))
    }
}
