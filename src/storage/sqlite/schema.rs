//! Versioned schema for the `SQLite` backend.
//!
//! The applied version is kept in `PRAGMA user_version`; each migration runs
//! in its own transaction together with the version bump.

use crate::{Error, Result};
use rusqlite::Connection;

/// A single migration with version and SQL.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    /// Migration version (sequential, starting at 1).
    pub version: i64,
    /// Human-readable description.
    pub description: &'static str,
    /// SQL to apply (may contain multiple statements).
    pub sql: &'static str,
}

/// Every migration, oldest first.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "users and scores",
    sql: "
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS scores (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            game_type TEXT NOT NULL,
            score INTEGER NOT NULL CHECK (score >= 0),
            time REAL NOT NULL CHECK (time > 0),
            difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_scores_board
            ON scores(game_type, difficulty, time, created_at);
        CREATE INDEX IF NOT EXISTS idx_scores_user
            ON scores(user_id, game_type, difficulty, created_at);
        CREATE INDEX IF NOT EXISTS idx_users_created_at
            ON users(created_at DESC);
    ",
}];

/// Returns the highest version in `migrations`.
#[must_use]
pub fn max_version(migrations: &[Migration]) -> i64 {
    migrations.iter().map(|m| m.version).max().unwrap_or(0)
}

/// Returns the schema version recorded in the database.
///
/// # Errors
///
/// Returns [`Error::Storage`] if the pragma cannot be read.
pub fn current_version(conn: &Connection) -> Result<i64> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|e| Error::storage("read_schema_version", e))
}

/// Applies every migration newer than the recorded version.
///
/// # Errors
///
/// Returns [`Error::Storage`] if a migration fails; earlier migrations stay
/// applied.
pub fn migrate(conn: &mut Connection, migrations: &[Migration]) -> Result<()> {
    let current = current_version(conn)?;
    if current > max_version(migrations) {
        return Err(Error::storage(
            "migrate",
            format!("database schema version {current} is newer than this build supports"),
        ));
    }

    for migration in migrations.iter().filter(|m| m.version > current) {
        let tx = conn
            .transaction()
            .map_err(|e| Error::storage("migrate", e))?;
        tx.execute_batch(migration.sql)
            .map_err(|e| migration_error(migration, &e))?;
        tx.pragma_update(None, "user_version", migration.version)
            .map_err(|e| migration_error(migration, &e))?;
        tx.commit().map_err(|e| migration_error(migration, &e))?;
        tracing::info!(
            version = migration.version,
            description = migration.description,
            "applied sqlite migration"
        );
    }
    Ok(())
}

fn migration_error(migration: &Migration, cause: &rusqlite::Error) -> Error {
    Error::storage(
        "migrate",
        format!(
            "migration {} ({}): {cause}",
            migration.version, migration.description
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_fresh_database() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, MIGRATIONS).unwrap();
        assert_eq!(current_version(&conn).unwrap(), max_version(MIGRATIONS));

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'scores')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn, MIGRATIONS).unwrap();
        migrate(&mut conn, MIGRATIONS).unwrap();
        assert_eq!(current_version(&conn).unwrap(), 1);
    }

    #[test]
    fn test_rejects_newer_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.pragma_update(None, "user_version", 99).unwrap();
        assert!(matches!(
            migrate(&mut conn, MIGRATIONS),
            Err(Error::Storage { .. })
        ));
    }

    #[test]
    fn test_max_version_empty() {
        assert_eq!(max_version(&[]), 0);
    }
}
