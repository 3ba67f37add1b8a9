//! Storage layer abstraction.
//!
//! One operation contract, [`StorageBackend`], with three implementations:
//!
//! | Backend | Durability | Location |
//! |---------|------------|----------|
//! | [`MemoryBackend`] | none | process memory |
//! | [`FileBackend`] | JSON snapshot after every mutation | `users.json`, `scores.json` |
//! | [`SqliteBackend`] | `SQLite` transactions | `focusgrid.db` |
//!
//! [`BackendFactory`] builds the configured backend once at startup; callers
//! share it as `Arc<dyn StorageBackend>` and observe identical ordering,
//! uniqueness and integrity rules whichever backend is active.

// Allow cast precision loss for averages over counts.
#![allow(clippy::cast_precision_loss)]
// Guards are held for the whole statement on purpose.
#![allow(clippy::significant_drop_tightening)]

mod clock;
mod file;
pub mod lock;
mod memory;
mod metrics;
mod ranking;
pub mod sqlite;
mod traits;

pub use clock::MonotonicClock;
pub use file::{FileBackend, SCORES_FILE, USERS_FILE};
pub use memory::MemoryBackend;
pub use metrics::record_operation_metrics;
pub use ranking::{aggregate_stats, leaderboard_order, newest_score_first, newest_user_first};
pub use sqlite::SqliteBackend;
pub use traits::{Committed, DurabilityWarning, StorageBackend};

use crate::config::StorageConfig;
use crate::{Error, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Special database name that selects a private in-memory `SQLite` database.
pub const SQLITE_IN_MEMORY: &str = ":memory:";

/// Backend type for score storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Volatile maps; everything is lost on exit.
    Memory,
    /// JSON snapshot files.
    File,
    /// `SQLite` database.
    #[default]
    Sqlite,
}

impl BackendType {
    /// Returns the configuration name of the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Sqlite => "sqlite",
        }
    }

    /// Parses a backend name, ignoring ASCII case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Some(Self::Memory),
            "file" | "json" => Some(Self::File),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unknown storage backend '{s}' (expected memory, file or sqlite)"
            ))
        })
    }
}

/// Factory for the configured storage backend.
pub struct BackendFactory;

impl BackendFactory {
    /// Creates the backend selected by `config.backend`.
    ///
    /// Relative file names are resolved against `config.data_dir`. A
    /// `database` of `:memory:` opens a private in-memory `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the data directory or database cannot be
    /// opened.
    pub fn create(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>> {
        Self::create_with_backend(config.backend, config)
    }

    /// Creates a specific backend, taking paths from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the data directory or database cannot be
    /// opened.
    pub fn create_with_backend(
        backend: BackendType,
        config: &StorageConfig,
    ) -> Result<Arc<dyn StorageBackend>> {
        let storage: Arc<dyn StorageBackend> = match backend {
            BackendType::Memory => {
                tracing::warn!("using in-memory storage, nothing will be persisted");
                Arc::new(MemoryBackend::new())
            },
            BackendType::File => Arc::new(FileBackend::new(
                resolve(&config.data_dir, &config.users_file),
                resolve(&config.data_dir, &config.scores_file),
            )?),
            BackendType::Sqlite if config.database == SQLITE_IN_MEMORY => {
                Arc::new(SqliteBackend::in_memory()?)
            },
            BackendType::Sqlite => Arc::new(SqliteBackend::new(resolve(
                &config.data_dir,
                Path::new(&config.database),
            ))?),
        };

        tracing::info!(backend = storage.backend_name(), "storage backend ready");
        Ok(storage)
    }
}

fn resolve(data_dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        data_dir.join(file)
    }
}
