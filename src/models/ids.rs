//! Record identifiers.
//!
//! Identifiers are random version 4 UUIDs rendered in the hyphenated
//! lowercase layout `xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx`. The version nibble
//! and the variant bits sit at fixed positions, so every generated identifier
//! has the same shape regardless of its random payload. Generation needs no
//! shared state and is safe from any thread.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generates a new opaque identifier string.
///
/// No ordering is implied between successive identifiers.
///
/// # Examples
///
/// ```rust
/// let id = focusgrid::models::new_identifier();
/// assert_eq!(id.len(), 36);
/// assert_eq!(&id[14..15], "4");
/// ```
#[must_use]
pub fn new_identifier() -> String {
    Uuid::new_v4().hyphenated().to_string()
}

/// Unique identifier for a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random user ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(new_identifier())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a score record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreId(String);

impl ScoreId {
    /// Creates a score ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random score ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(new_identifier())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ScoreId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ScoreId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identifier_layout() {
        let id = new_identifier();
        let bytes = id.as_bytes();

        assert_eq!(id.len(), 36);
        for pos in [8, 13, 18, 23] {
            assert_eq!(bytes[pos], b'-');
        }
        assert_eq!(bytes[14], b'4');
        assert!(matches!(bytes[19], b'8' | b'9' | b'a' | b'b'));
        assert!(
            id.chars()
                .all(|c| c == '-' || c.is_ascii_digit() || ('a'..='f').contains(&c))
        );
    }

    #[test]
    fn test_identifiers_are_distinct() {
        let ids: HashSet<String> = (0..1000).map(|_| new_identifier()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_id_conversions() {
        let from_str = UserId::from("abc");
        let from_string = UserId::from("abc".to_string());
        assert_eq!(from_str, from_string);
        assert_eq!(from_str.as_str(), "abc");
        assert_eq!(ScoreId::new("xyz").to_string(), "xyz");
    }

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = ScoreId::new("s-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"s-1\"");
    }
}
