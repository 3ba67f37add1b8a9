//! Binary entry point for focusgrid.
//!
//! This binary provides the CLI interface for accounts, score submission and
//! leaderboard administration.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use focusgrid::cli::{
    CliResult, OutputFormat, RegisterArgs, SubmitArgs, cmd_delete_score, cmd_delete_user,
    cmd_leaderboard, cmd_login, cmd_register, cmd_scores, cmd_stats, cmd_status, cmd_submit,
    cmd_users,
};
use focusgrid::config::{DEFAULT_GAME_TYPE, FocusgridConfig};
use focusgrid::models::Difficulty;
use focusgrid::observability::{self, ObservabilityConfig};
use focusgrid::services::ServiceContainer;
use secrecy::SecretString;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Focusgrid - accounts and leaderboards for a number-grid attention game.
#[derive(Parser)]
#[command(name = "focusgrid")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Create an account.
    Register {
        /// Username (3-20 letters, digits or underscores).
        username: String,

        /// Password (6-20 letters, digits or underscores).
        #[arg(short, long, env = "FOCUSGRID_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation; defaults to the password.
        #[arg(long)]
        confirm: Option<String>,

        /// Accept the privacy terms.
        #[arg(long)]
        agree_to_terms: bool,
    },

    /// Check a username and password.
    Login {
        /// Username.
        username: String,

        /// Password.
        #[arg(short, long, env = "FOCUSGRID_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Record a game result.
    Submit {
        /// Username.
        username: String,

        /// Password.
        #[arg(short, long, env = "FOCUSGRID_PASSWORD", hide_env_values = true)]
        password: String,

        /// Points earned.
        #[arg(short, long, allow_negative_numbers = true)]
        score: i64,

        /// Completion time in seconds.
        #[arg(short, long, allow_negative_numbers = true)]
        time: f64,

        /// Difficulty: easy, medium or hard.
        #[arg(short, long)]
        difficulty: Option<String>,

        /// Game type.
        #[arg(short, long, default_value = DEFAULT_GAME_TYPE)]
        game: String,
    },

    /// Show the best times for a game and difficulty.
    Leaderboard {
        /// Game type.
        #[arg(short, long, default_value = DEFAULT_GAME_TYPE)]
        game: String,

        /// Difficulty: easy, medium or hard.
        #[arg(short, long, default_value = "easy")]
        difficulty: String,

        /// Maximum number of entries.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format: table or json.
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show your own results.
    Scores {
        /// Username.
        username: String,

        /// Password.
        #[arg(short, long, env = "FOCUSGRID_PASSWORD", hide_env_values = true)]
        password: String,

        /// Game type.
        #[arg(short, long, default_value = DEFAULT_GAME_TYPE)]
        game: String,

        /// Difficulty: easy, medium or hard.
        #[arg(short, long, default_value = "easy")]
        difficulty: String,

        /// Output format: table or json.
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// List users, newest first.
    Users {
        /// Page number (1-indexed).
        #[arg(long, default_value = "1")]
        page: usize,

        /// Users per page.
        #[arg(long, default_value = "10")]
        page_size: usize,

        /// Case-insensitive username filter.
        #[arg(short, long, default_value = "")]
        search: String,

        /// Output format: table or json.
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Delete a user and the user's scores.
    DeleteUser {
        /// User ID.
        id: String,
    },

    /// Delete one score.
    DeleteScore {
        /// Score ID.
        id: String,
    },

    /// Aggregate scores per game and difficulty.
    Stats {
        /// Output format: table or json.
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show the backend and record counts.
    Status,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match FocusgridConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    if let Err(e) = observability::init(ObservabilityConfig::from_config(&config, cli.verbose)) {
        eprintln!("Failed to initialize observability: {e}");
        return ExitCode::FAILURE;
    }

    match run_command(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: &FocusgridConfig) -> CliResult {
    let services = ServiceContainer::from_config(config)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Register {
            username,
            password,
            confirm,
            agree_to_terms,
        } => cmd_register(
            &services,
            RegisterArgs {
                username,
                password: SecretString::from(password),
                confirm: confirm.map(SecretString::from),
                agree_to_terms,
            },
            &mut out,
        ),

        Commands::Login { username, password } => {
            cmd_login(&services, &username, &SecretString::from(password), &mut out)
        },

        Commands::Submit {
            username,
            password,
            score,
            time,
            difficulty,
            game,
        } => cmd_submit(
            &services,
            SubmitArgs {
                username,
                password: SecretString::from(password),
                score,
                time,
                difficulty: difficulty.as_deref().map(str::parse).transpose()?,
                game,
            },
            &mut out,
        ),

        Commands::Leaderboard {
            game,
            difficulty,
            limit,
            format,
        } => cmd_leaderboard(
            &services,
            &game,
            difficulty.parse::<Difficulty>()?,
            limit,
            OutputFormat::parse(&format),
            &mut out,
        ),

        Commands::Scores {
            username,
            password,
            game,
            difficulty,
            format,
        } => cmd_scores(
            &services,
            &username,
            &SecretString::from(password),
            &game,
            difficulty.parse::<Difficulty>()?,
            OutputFormat::parse(&format),
            &mut out,
        ),

        Commands::Users {
            page,
            page_size,
            search,
            format,
        } => cmd_users(
            &services,
            page,
            page_size,
            &search,
            OutputFormat::parse(&format),
            &mut out,
        ),

        Commands::DeleteUser { id } => cmd_delete_user(&services, &id, &mut out),

        Commands::DeleteScore { id } => cmd_delete_score(&services, &id, &mut out),

        Commands::Stats { format } => cmd_stats(&services, OutputFormat::parse(&format), &mut out),

        Commands::Status => cmd_status(&services, &mut out),
    }
}
