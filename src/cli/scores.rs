//! Score commands.

use super::{CliResult, OutputFormat, report_durability, truncate, write_json};
use crate::models::{Difficulty, LeaderboardEntry, Score};
use crate::services::{ServiceContainer, SubmitScore};
use secrecy::SecretString;
use std::io::Write;

/// Arguments for the `submit` command.
#[derive(Debug)]
pub struct SubmitArgs {
    /// Player username.
    pub username: String,
    /// Player password.
    pub password: SecretString,
    /// Points earned.
    pub score: i64,
    /// Completion time in seconds.
    pub time: f64,
    /// Difficulty, `easy` when absent.
    pub difficulty: Option<Difficulty>,
    /// Game tag.
    pub game: String,
}

/// Logs in and records a score.
///
/// # Errors
///
/// Returns an error if the credentials are wrong, the score is invalid, or
/// storage fails.
pub fn cmd_submit<W: Write>(
    services: &ServiceContainer,
    args: SubmitArgs,
    out: &mut W,
) -> CliResult {
    let user = services.accounts().login(&args.username, &args.password)?;
    let score = report_durability(services.scores().submit(SubmitScore {
        user_id: user.id,
        game_type: args.game,
        score: args.score,
        time: args.time,
        difficulty: args.difficulty,
    })?);

    writeln!(
        out,
        "Recorded {:.3}s on {} ({}) for {} [{}]",
        score.time, score.game_type, score.difficulty, user.username, score.id
    )?;
    Ok(())
}

/// Prints a leaderboard.
///
/// # Errors
///
/// Returns an error if the game type is unknown or storage fails.
pub fn cmd_leaderboard<W: Write>(
    services: &ServiceContainer,
    game: &str,
    difficulty: Difficulty,
    limit: Option<usize>,
    format: OutputFormat,
    out: &mut W,
) -> CliResult {
    let entries = services.scores().leaderboard(game, difficulty, limit)?;
    match format {
        OutputFormat::Json => write_json(out, &entries),
        OutputFormat::Table => {
            write_leaderboard_table(out, game, difficulty, &entries)?;
            Ok(())
        },
    }
}

/// Logs in and prints the player's own scores.
///
/// # Errors
///
/// Returns an error if the credentials are wrong, the game type is unknown,
/// or storage fails.
pub fn cmd_scores<W: Write>(
    services: &ServiceContainer,
    username: &str,
    password: &SecretString,
    game: &str,
    difficulty: Difficulty,
    format: OutputFormat,
    out: &mut W,
) -> CliResult {
    let user = services.accounts().login(username, password)?;
    let scores = services.scores().user_scores(&user.id, game, difficulty)?;
    match format {
        OutputFormat::Json => write_json(out, &scores),
        OutputFormat::Table => {
            write_scores_table(out, &scores)?;
            Ok(())
        },
    }
}

fn write_leaderboard_table<W: Write>(
    writer: &mut W,
    game: &str,
    difficulty: Difficulty,
    entries: &[LeaderboardEntry],
) -> std::io::Result<()> {
    writeln!(writer, "Leaderboard: {game} ({difficulty})")?;
    if entries.is_empty() {
        writeln!(writer, "No scores yet.")?;
        return Ok(());
    }

    writeln!(
        writer,
        "{:<6}{:<22}{:>10}{:>8}  SUBMITTED",
        "RANK", "PLAYER", "TIME", "SCORE"
    )?;
    for (rank, entry) in entries.iter().enumerate() {
        writeln!(
            writer,
            "{:<6}{:<22}{:>10.3}{:>8}  {}",
            rank + 1,
            truncate(&entry.username, 20),
            entry.score.time,
            entry.score.score,
            entry.score.created_at.format("%Y-%m-%d %H:%M")
        )?;
    }
    Ok(())
}

fn write_scores_table<W: Write>(writer: &mut W, scores: &[Score]) -> std::io::Result<()> {
    if scores.is_empty() {
        writeln!(writer, "No scores yet.")?;
        return Ok(());
    }

    writeln!(writer, "{:<38}{:>10}{:>8}  SUBMITTED", "ID", "TIME", "SCORE")?;
    for score in scores {
        writeln!(
            writer,
            "{:<38}{:>10.3}{:>8}  {}",
            score.id,
            score.time,
            score.score,
            score.created_at.format("%Y-%m-%d %H:%M")
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FocusgridConfig;
    use crate::services::RegisterRequest;
    use crate::storage::MemoryBackend;
    use std::sync::Arc;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn services_with_player() -> ServiceContainer {
        let services = ServiceContainer::with_storage(
            Arc::new(MemoryBackend::new()),
            &FocusgridConfig::default(),
        );
        services
            .accounts()
            .register(RegisterRequest {
                username: "ada".to_string(),
                password: secret("secret_1"),
                confirm_password: secret("secret_1"),
                agree_to_terms: true,
            })
            .unwrap();
        services
    }

    fn submit(services: &ServiceContainer, time: f64) {
        let mut out = Vec::new();
        cmd_submit(
            services,
            SubmitArgs {
                username: "ada".to_string(),
                password: secret("secret_1"),
                score: 25,
                time,
                difficulty: Some(Difficulty::Hard),
                game: "number-game".to_string(),
            },
            &mut out,
        )
        .unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("Recorded"));
    }

    #[test]
    fn test_leaderboard_table() {
        let services = services_with_player();
        submit(&services, 20.5);
        submit(&services, 12.25);

        let mut out = Vec::new();
        cmd_leaderboard(
            &services,
            "number-game",
            Difficulty::Hard,
            None,
            OutputFormat::Table,
            &mut out,
        )
        .unwrap();
        let output = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Leaderboard: number-game (hard)");
        assert!(lines[1].starts_with("RANK"));
        assert!(lines[2].starts_with("1     ada"));
        assert!(lines[2].contains("12.250"));
        assert!(lines[3].contains("20.500"));
    }

    #[test]
    fn test_leaderboard_json_and_empty_table() {
        let services = services_with_player();
        submit(&services, 9.0);

        let mut out = Vec::new();
        cmd_leaderboard(
            &services,
            "number-game",
            Difficulty::Hard,
            Some(5),
            OutputFormat::Json,
            &mut out,
        )
        .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed[0]["username"], "ada");
        assert_eq!(parsed[0]["difficulty"], "hard");

        let mut out = Vec::new();
        cmd_leaderboard(
            &services,
            "number-game",
            Difficulty::Easy,
            None,
            OutputFormat::Table,
            &mut out,
        )
        .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("No scores yet."));
    }

    #[test]
    fn test_scores_requires_login() {
        let services = services_with_player();
        submit(&services, 9.0);

        let mut out = Vec::new();
        cmd_scores(
            &services,
            "ada",
            &secret("secret_1"),
            "number-game",
            Difficulty::Hard,
            OutputFormat::Table,
            &mut out,
        )
        .unwrap();
        assert!(String::from_utf8(out).unwrap().contains("9.000"));

        let mut out = Vec::new();
        assert!(
            cmd_scores(
                &services,
                "ada",
                &secret("wrong_pw"),
                "number-game",
                Difficulty::Hard,
                OutputFormat::Table,
                &mut out,
            )
            .is_err()
        );
    }
}
