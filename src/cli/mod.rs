//! CLI command implementations.
//!
//! Each submodule implements a group of commands on top of a
//! [`ServiceContainer`](crate::services::ServiceContainer). Commands write
//! their result to the supplied writer and durability warnings to stderr.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `register` | Create an account |
//! | `login` | Check a username and password |
//! | `submit` | Record a game result |
//! | `leaderboard` | Show the best times for a game and difficulty |
//! | `scores` | Show one player's results |
//! | `users` | List users, newest first |
//! | `delete-user` | Delete a user and the user's scores |
//! | `delete-score` | Delete one score |
//! | `stats` | Aggregate scores per game and difficulty |
//! | `status` | Show the backend and record counts |
//!
//! # Example Usage
//!
//! ```bash
//! focusgrid register ada --password secret_1 --agree-to-terms
//! focusgrid submit ada --password secret_1 --score 25 --time 14.2 --difficulty hard
//! focusgrid leaderboard --difficulty hard --format json
//! ```

mod account;
mod admin;
mod scores;

pub use account::{RegisterArgs, cmd_login, cmd_register};
pub use admin::{cmd_delete_score, cmd_delete_user, cmd_stats, cmd_status, cmd_users};
pub use scores::{SubmitArgs, cmd_leaderboard, cmd_scores, cmd_submit};

use crate::storage::Committed;
use serde::Serialize;
use std::io::Write;

/// Result type of CLI commands.
pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text table (default).
    #[default]
    Table,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses output format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Table,
        }
    }
}

/// Writes `value` as pretty JSON followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> CliResult {
    let json = serde_json::to_string_pretty(value)?;
    writeln!(writer, "{json}")?;
    Ok(())
}

/// Prints a durability warning to stderr and returns the committed value.
#[allow(clippy::print_stderr)]
pub fn report_durability<T>(committed: Committed<T>) -> T {
    if let Some(warning) = &committed.warning {
        eprintln!("Warning: {warning}");
    }
    committed.value
}

/// Truncates `s` to at most `max` characters.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}~")
    }
}
