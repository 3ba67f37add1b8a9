//! Registered player accounts.

use super::UserId;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered user.
///
/// Users are immutable after creation. The password hash is an opaque digest
/// produced by a [`PasswordHasher`](crate::services::PasswordHasher) and is
/// never included in serialized output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Unique, case-sensitive login name.
    pub username: String,
    /// Password digest.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Creation timestamp (UTC, microsecond precision).
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Returns true if the username contains `needle`, ignoring ASCII case.
    ///
    /// An empty needle matches every user.
    #[must_use]
    pub fn username_contains(&self, needle: &str) -> bool {
        needle.is_empty()
            || self
                .username
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase())
    }
}
