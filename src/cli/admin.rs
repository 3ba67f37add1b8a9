//! Administrative commands.

use super::{CliResult, OutputFormat, report_durability, truncate, write_json};
use crate::models::{Page, ScoreId, ScoreStats, User, UserId};
use crate::services::ServiceContainer;
use std::io::Write;

/// Lists users, newest first.
///
/// # Errors
///
/// Returns an error if storage fails.
pub fn cmd_users<W: Write>(
    services: &ServiceContainer,
    page: usize,
    page_size: usize,
    search: &str,
    format: OutputFormat,
    out: &mut W,
) -> CliResult {
    let users = services.admin().list_users(page, page_size, search)?;
    match format {
        OutputFormat::Json => write_json(out, &users),
        OutputFormat::Table => {
            write_users_table(out, &users)?;
            Ok(())
        },
    }
}

/// Deletes a user and the user's scores.
///
/// # Errors
///
/// Returns an error if the user does not exist or storage fails.
pub fn cmd_delete_user<W: Write>(services: &ServiceContainer, id: &str, out: &mut W) -> CliResult {
    report_durability(services.admin().delete_user(&UserId::new(id))?);
    writeln!(out, "Deleted user {id}")?;
    Ok(())
}

/// Deletes one score.
///
/// # Errors
///
/// Returns an error if the score does not exist or storage fails.
pub fn cmd_delete_score<W: Write>(
    services: &ServiceContainer,
    id: &str,
    out: &mut W,
) -> CliResult {
    report_durability(services.admin().delete_score(&ScoreId::new(id))?);
    writeln!(out, "Deleted score {id}")?;
    Ok(())
}

/// Prints per-game statistics.
///
/// # Errors
///
/// Returns an error if storage fails.
pub fn cmd_stats<W: Write>(
    services: &ServiceContainer,
    format: OutputFormat,
    out: &mut W,
) -> CliResult {
    let stats = services.admin().score_stats()?;
    match format {
        OutputFormat::Json => write_json(out, &stats),
        OutputFormat::Table => {
            write_stats_table(out, &stats)?;
            Ok(())
        },
    }
}

/// Prints the backend and record counts.
///
/// # Errors
///
/// Returns an error if storage fails.
pub fn cmd_status<W: Write>(services: &ServiceContainer, out: &mut W) -> CliResult {
    let status = services.admin().status()?;
    writeln!(out, "Focusgrid Status")?;
    writeln!(out, "================")?;
    writeln!(out)?;
    writeln!(out, "Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(out, "Backend: {}", status.backend)?;
    writeln!(out, "Users:   {}", status.users)?;
    writeln!(out, "Scores:  {}", status.scores)?;
    Ok(())
}

fn write_users_table<W: Write>(writer: &mut W, users: &Page<User>) -> std::io::Result<()> {
    writeln!(writer, "{:<38}{:<22}CREATED", "ID", "USERNAME")?;
    for user in &users.items {
        writeln!(
            writer,
            "{:<38}{:<22}{}",
            user.id,
            truncate(&user.username, 20),
            user.created_at.format("%Y-%m-%d %H:%M:%S")
        )?;
    }
    writeln!(
        writer,
        "Page {} of {} ({} users)",
        users.page,
        users.total_pages().max(1),
        users.total
    )
}

fn write_stats_table<W: Write>(writer: &mut W, stats: &[ScoreStats]) -> std::io::Result<()> {
    if stats.is_empty() {
        writeln!(writer, "No scores yet.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<16}{:<8}{:>7}{:>10}{:>10}{:>10}{:>10}",
        "GAME", "LEVEL", "COUNT", "AVG", "BEST", "WORST", "AVG PTS"
    )?;
    for row in stats {
        writeln!(
            writer,
            "{:<16}{:<8}{:>7}{:>10.3}{:>10.3}{:>10.3}{:>10.1}",
            truncate(&row.game_type, 15),
            row.difficulty.as_str(),
            row.count,
            row.avg_time,
            row.min_time,
            row.max_time,
            row.avg_score
        )?;
    }
    Ok(())
}
