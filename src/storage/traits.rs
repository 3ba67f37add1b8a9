//! Storage backend trait.

use crate::Result;
use crate::models::{
    Difficulty, LeaderboardEntry, NewScore, Page, PageRequest, Score, ScoreId, ScoreStats, User,
    UserId,
};
use std::fmt;

/// A snapshot write that failed after the logical operation completed.
///
/// The mutation is visible to every later call on the same backend; only its
/// on-disk copy is behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurabilityWarning {
    /// The operation whose snapshot failed.
    pub operation: String,
    /// The underlying cause.
    pub cause: String,
}

impl fmt::Display for DurabilityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' completed but was not persisted: {}",
            self.operation, self.cause
        )
    }
}

/// The result of a successful mutation.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Committed<T> {
    /// The created record, or `()` for deletions.
    pub value: T,
    /// Set when the change could not be written to durable storage.
    pub warning: Option<DurabilityWarning>,
}

impl<T> Committed<T> {
    /// A mutation that is as durable as its backend allows.
    pub const fn durable(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    /// Attaches a durability warning, replacing any previous one.
    pub fn with_warning(mut self, warning: Option<DurabilityWarning>) -> Self {
        if warning.is_some() {
            self.warning = warning;
        }
        self
    }

    /// Returns true if no durability warning was raised.
    #[must_use]
    pub const fn is_durable(&self) -> bool {
        self.warning.is_none()
    }

    /// Discards the warning and returns the value.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Maps the value, keeping the warning.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Committed<U> {
        Committed {
            value: f(self.value),
            warning: self.warning,
        }
    }
}

/// Operation contract shared by every storage backend.
///
/// Callers hold an `Arc<dyn StorageBackend>` and never learn which backend is
/// active. Every operation is a synchronous call that may block briefly on a
/// lock or on I/O and always runs to completion.
///
/// # Guarantees
///
/// - `create_user` is atomic per username: of N concurrent calls with the same
///   username exactly one succeeds and the rest fail with
///   [`Error::DuplicateUsername`](crate::Error::DuplicateUsername).
/// - Mutations of one entity type are linearizable; readers never observe a
///   half-applied mutation.
/// - `created_at` is strictly increasing across records of one backend
///   instance.
/// - Leaderboards are ordered by `time` ascending, then `created_at`
///   ascending, then `id`, identically in every backend.
/// - Scores must reference an existing user; deleting a user deletes its
///   scores.
pub trait StorageBackend: Send + Sync {
    /// Short backend name used in logs and metrics.
    fn backend_name(&self) -> &'static str;

    /// Registers a user.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateUsername`](crate::Error::DuplicateUsername)
    /// if the username is taken, or a storage error.
    fn create_user(&self, username: &str, password_hash: &str) -> Result<Committed<User>>;

    /// Finds a user by exact (case-sensitive) username.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_user_by_id(&self, id: &UserId) -> Result<Option<User>>;

    /// Lists users newest first.
    ///
    /// An empty `search` matches everyone; otherwise usernames must contain
    /// it, ignoring ASCII case. A page past the end is empty, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_users(&self, request: PageRequest, search: &str) -> Result<Page<User>>;

    /// Deletes a user and all of that user's scores.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if no such user
    /// exists, or a storage error.
    fn delete_user(&self, id: &UserId) -> Result<Committed<()>>;

    /// Returns the number of registered users.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn count_users(&self) -> Result<u64>;

    /// Records a new score. Never modifies an existing one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidReference`](crate::Error::InvalidReference) if
    /// the user does not exist, [`Error::InvalidInput`](crate::Error::InvalidInput)
    /// if `time` is not a positive finite number, or a storage error.
    fn create_score(&self, score: NewScore) -> Result<Committed<Score>>;

    /// Returns the best `limit` scores for a game and difficulty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn leaderboard(
        &self,
        game_type: &str,
        difficulty: Difficulty,
        limit: usize,
    ) -> Result<Vec<LeaderboardEntry>>;

    /// Returns one user's scores for a game and difficulty, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn user_scores(
        &self,
        user_id: &UserId,
        game_type: &str,
        difficulty: Difficulty,
    ) -> Result<Vec<Score>>;

    /// Aggregates scores per (game type, difficulty).
    ///
    /// Groups without scores are omitted. Rows are ordered by game type, then
    /// difficulty rank.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn score_stats(&self) -> Result<Vec<ScoreStats>>;

    /// Deletes a score.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if no such score
    /// exists, or a storage error.
    fn delete_score(&self, id: &ScoreId) -> Result<Committed<()>>;

    /// Returns the number of stored scores.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn count_scores(&self) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_committed_durable() {
        let c = Committed::durable(5);
        assert!(c.is_durable());
        assert_eq!(c.into_inner(), 5);
    }

    #[test]
    fn test_committed_with_warning() {
        let warning = DurabilityWarning {
            operation: "create_user".to_string(),
            cause: "read-only filesystem".to_string(),
        };
        let c = Committed::durable("ada").with_warning(Some(warning.clone()));
        assert!(!c.is_durable());

        let mapped = c.map(str::len);
        assert_eq!(mapped.value, 3);
        assert_eq!(mapped.warning, Some(warning));

        let kept = Committed::durable(()).with_warning(None);
        assert!(kept.is_durable());
    }

    #[test]
    fn test_warning_display() {
        let warning = DurabilityWarning {
            operation: "delete_score".to_string(),
            cause: "disk full".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "'delete_score' completed but was not persisted: disk full"
        );
    }
}
