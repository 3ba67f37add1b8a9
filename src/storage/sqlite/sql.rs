//! SQL text and query helpers for the `SQLite` backend.
//!
//! Ordering clauses here must agree with `storage::ranking`.

/// Escapes SQL LIKE wildcards in a string to make them literal.
///
/// SQL LIKE uses `%` (match any characters) and `_` (match single character)
/// as wildcards. Usernames may contain `_`, so a search for `a_b` must not
/// match `axb`. Use with `ESCAPE '\'`.
///
/// # Examples
///
/// ```
/// use focusgrid::storage::sqlite::escape_like_wildcards;
///
/// assert_eq!(escape_like_wildcards("100%"), "100\\%");
/// assert_eq!(escape_like_wildcards("user_name"), "user\\_name");
/// assert_eq!(escape_like_wildcards("path\\file"), "path\\\\file");
/// ```
#[must_use]
pub fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            },
            _ => result.push(c),
        }
    }
    result
}

/// Builds the `LIKE` pattern for a username search.
///
/// `SQLite`'s `LIKE` folds ASCII case only, matching the in-memory search.
#[must_use]
pub fn contains_pattern(search: &str) -> String {
    format!("%{}%", escape_like_wildcards(search))
}

pub const INSERT_USER: &str =
    "INSERT INTO users (id, username, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)";

pub const SELECT_USER_BY_USERNAME: &str =
    "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1";

pub const SELECT_USER_BY_ID: &str =
    "SELECT id, username, password_hash, created_at FROM users WHERE id = ?1";

pub const COUNT_USERS_MATCHING: &str =
    "SELECT COUNT(*) FROM users WHERE ?1 = '' OR username LIKE ?2 ESCAPE '\\'";

pub const SELECT_USERS_PAGE: &str = "SELECT id, username, password_hash, created_at FROM users
     WHERE ?1 = '' OR username LIKE ?2 ESCAPE '\\'
     ORDER BY created_at DESC, id ASC
     LIMIT ?3 OFFSET ?4";

pub const DELETE_USER: &str = "DELETE FROM users WHERE id = ?1";

pub const COUNT_USERS: &str = "SELECT COUNT(*) FROM users";

pub const INSERT_SCORE: &str = "INSERT INTO scores
     (id, user_id, game_type, score, time, difficulty, created_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";

pub const SELECT_LEADERBOARD: &str = "SELECT s.id, s.user_id, s.game_type, s.score, s.time,
            s.difficulty, s.created_at, u.username
     FROM scores s
     JOIN users u ON u.id = s.user_id
     WHERE s.game_type = ?1 AND s.difficulty = ?2
     ORDER BY s.time ASC, s.created_at ASC, s.id ASC
     LIMIT ?3";

pub const SELECT_USER_SCORES: &str = "SELECT id, user_id, game_type, score, time, difficulty, created_at
     FROM scores
     WHERE user_id = ?1 AND game_type = ?2 AND difficulty = ?3
     ORDER BY created_at DESC, id ASC";

pub const SELECT_ALL_SCORES: &str =
    "SELECT id, user_id, game_type, score, time, difficulty, created_at FROM scores";

pub const DELETE_SCORE: &str = "DELETE FROM scores WHERE id = ?1";

pub const COUNT_SCORES: &str = "SELECT COUNT(*) FROM scores";

pub const LATEST_CREATED_AT: &str = "SELECT MAX(ts) FROM (
         SELECT MAX(created_at) AS ts FROM users
         UNION ALL
         SELECT MAX(created_at) AS ts FROM scores
     )";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like_wildcards("plain"), "plain");
        assert_eq!(escape_like_wildcards("a_b"), "a\\_b");
        assert_eq!(escape_like_wildcards("%_\\"), "\\%\\_\\\\");
        assert_eq!(escape_like_wildcards(""), "");
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("ad"), "%ad%");
        assert_eq!(contains_pattern("a_"), "%a\\_%");
    }
}
