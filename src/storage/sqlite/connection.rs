//! Connection setup and error mapping for the `SQLite` backend.

use crate::{Error, Result};
use rusqlite::{Connection, ErrorCode, ffi};
use std::time::Duration;

/// How long a statement waits on a locked database before failing.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configures a `SQLite` connection for concurrent use.
///
/// # Configuration Applied
///
/// - **WAL mode**: concurrent readers with a single writer
/// - **NORMAL synchronous**: durable across application crashes, fsync on checkpoint
/// - **`busy_timeout`**: waits up to 5 seconds for locks instead of failing immediately
/// - **`foreign_keys`**: enforces `scores.user_id` and the delete cascade
///
/// # Errors
///
/// Returns [`Error::Storage`] if a pragma cannot be applied.
pub fn configure_connection(conn: &Connection) -> Result<()> {
    // journal_mode answers with the resulting mode; in-memory databases stay "memory".
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(|e| Error::storage("configure_journal_mode", e))?;
    tracing::debug!(journal_mode = %mode, "configured sqlite connection");

    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(|e| Error::storage("configure_synchronous", e))?;
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| Error::storage("configure_busy_timeout", e))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| Error::storage("configure_foreign_keys", e))?;

    Ok(())
}

/// Maps a driver error to the storage contract's error kinds.
///
/// `subject` names the username or user id involved, for the constraint
/// kinds' messages.
pub fn map_sqlite_error(operation: &'static str, subject: &str, err: rusqlite::Error) -> Error {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err
        && failure.code == ErrorCode::ConstraintViolation
    {
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE if operation == "create_user" => {
                return Error::DuplicateUsername(subject.to_string());
            },
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                return Error::InvalidReference(subject.to_string());
            },
            _ => {},
        }
    }
    Error::storage(operation, err)
}
