//! # Focusgrid
//!
//! Accounts and leaderboards for a number-grid attention training game.
//!
//! Players register, log in, and submit the time it took them to click the
//! numbers of a grid in order. Scores are ranked per game and difficulty.
//!
//! ## Features
//!
//! - One storage contract ([`StorageBackend`]) with three interchangeable backends:
//!   in-memory, JSON snapshot files, and `SQLite`
//! - Deterministic leaderboard ordering shared by every backend
//! - Atomic username uniqueness under concurrent registration
//! - Service layer that validates registration, login and score submission
//! - CLI front end for registration, score submission and administration
//!
//! ## Example
//!
//! ```rust
//! use focusgrid::models::{Difficulty, NewScore};
//! use focusgrid::storage::{MemoryBackend, StorageBackend};
//!
//! let store = MemoryBackend::new();
//! let user = store.create_user("ada", "$argon2id$digest")?.into_inner();
//! store.create_score(NewScore::new(user.id.clone(), "number-game", 25, 12.5, Difficulty::Easy))?;
//!
//! let board = store.leaderboard("number-game", Difficulty::Easy, 10)?;
//! assert_eq!(board[0].username, "ada");
//! # Ok::<(), focusgrid::Error>(())
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::FocusgridConfig;
pub use models::{
    Difficulty, LeaderboardEntry, NewScore, Page, PageRequest, Score, ScoreId, ScoreStats, User,
    UserId,
};
pub use services::{AccountService, AdminService, PasswordHasher, ScoreService};
pub use storage::{
    BackendFactory, BackendType, Committed, DurabilityWarning, FileBackend, MemoryBackend,
    SqliteBackend, StorageBackend,
};

/// Error type for focusgrid operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `DuplicateUsername` | `create_user` with a username that is already registered |
/// | `NotFound` | Deleting or loading a user or score that does not exist |
/// | `InvalidReference` | A score cites a user id with no matching user |
/// | `Storage` | A backend could not read or write its files or database |
/// | `InvalidInput` | Service-level validation rejects a request |
/// | `InvalidCredentials` | Login with an unknown username or wrong password |
/// | `Config` | Configuration or telemetry could not be loaded at startup |
///
/// The first four variants are the storage contract's error kinds. Backends
/// never return the others.
#[derive(Debug, ThisError)]
pub enum Error {
    /// The username is already registered.
    #[error("username already registered: {0}")]
    DuplicateUsername(String),

    /// A lookup or delete target does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record ("user" or "score").
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A score references a user that does not exist.
    #[error("score references unknown user: {0}")]
    InvalidReference(String),

    /// A storage operation failed.
    ///
    /// Raised when:
    /// - Snapshot files cannot be created or read at startup
    /// - `SQLite` statements fail for reasons other than constraint violations
    /// - The data directory cannot be created
    #[error("storage operation '{operation}' failed: {cause}")]
    Storage {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Username or password did not match.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// Startup configuration failed.
    #[error("configuration '{operation}' failed: {cause}")]
    Config {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Storage`] from any displayable cause.
    pub fn storage(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Storage {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Builds a [`Error::Config`] from any displayable cause.
    pub fn config(operation: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Config {
            operation: operation.into(),
            cause: cause.to_string(),
        }
    }

    /// Returns true for the error kinds of the storage contract.
    #[must_use]
    pub const fn is_storage_contract(&self) -> bool {
        matches!(
            self,
            Self::DuplicateUsername(_)
                | Self::NotFound { .. }
                | Self::InvalidReference(_)
                | Self::Storage { .. }
        )
    }
}

/// Result type alias for focusgrid operations.
pub type Result<T> = std::result::Result<T, Error>;
