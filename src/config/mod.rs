//! Configuration management.
//!
//! Settings come from, in increasing priority: built-in defaults, a TOML
//! file, and `FOCUSGRID_*` environment variables.

use crate::storage::BackendType;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "FOCUSGRID_CONFIG_PATH";

/// Game tag accepted when no list is configured.
pub const DEFAULT_GAME_TYPE: &str = "number-game";

/// Main configuration for focusgrid.
#[derive(Debug, Clone, Default)]
pub struct FocusgridConfig {
    /// Storage backend selection and paths.
    pub storage: StorageConfig,
    /// Game rules enforced by the services.
    pub game: GameConfig,
    /// Logging settings (resolved by `observability`).
    pub logging: LoggingSettings,
    /// Metrics settings (resolved by `observability`).
    pub metrics: MetricsSettings,
    /// The file this configuration was loaded from, if any.
    pub source: Option<PathBuf>,
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Which backend to build.
    pub backend: BackendType,
    /// Directory holding the snapshot files or database.
    pub data_dir: PathBuf,
    /// Users document for the file backend, relative to `data_dir`.
    pub users_file: PathBuf,
    /// Scores document for the file backend, relative to `data_dir`.
    pub scores_file: PathBuf,
    /// Database file for the `SQLite` backend, relative to `data_dir`, or `:memory:`.
    pub database: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendType::default(),
            data_dir: default_data_dir(),
            users_file: PathBuf::from(crate::storage::USERS_FILE),
            scores_file: PathBuf::from(crate::storage::SCORES_FILE),
            database: "focusgrid.db".to_string(),
        }
    }
}

/// Game rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    /// Accepted game tags.
    pub game_types: Vec<String>,
    /// Leaderboard size when the caller gives none.
    pub default_limit: usize,
    /// Largest leaderboard a caller may request.
    pub max_limit: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            game_types: vec![DEFAULT_GAME_TYPE.to_string()],
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl GameConfig {
    /// Returns true if `game_type` is configured.
    #[must_use]
    pub fn accepts(&self, game_type: &str) -> bool {
        self.game_types.iter().any(|g| g == game_type)
    }
}

/// Logging section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `info` or `focusgrid=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Metrics section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MetricsSettings {
    /// Whether to install the Prometheus exporter.
    pub enabled: Option<bool>,
    /// Port for the exporter's HTTP listener.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Storage section.
    pub storage: Option<ConfigFileStorage>,
    /// Game section.
    pub game: Option<ConfigFileGame>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
    /// Metrics section.
    pub metrics: Option<MetricsSettings>,
}

/// Storage section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStorage {
    /// Backend name.
    pub backend: Option<String>,
    /// Data directory; `~/` expands to the home directory.
    pub data_dir: Option<String>,
    /// Users document.
    pub users_file: Option<String>,
    /// Scores document.
    pub scores_file: Option<String>,
    /// Database file.
    pub database: Option<String>,
}

/// Game section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileGame {
    /// Accepted game tags.
    pub game_types: Option<Vec<String>>,
    /// Default leaderboard size.
    pub default_limit: Option<usize>,
    /// Maximum leaderboard size.
    pub max_limit: Option<usize>,
}

impl FocusgridConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the text is not valid TOML for this schema
    /// or names an unknown backend.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| Error::config("parse_config_file", e))?;
        Self::from_config_file(file)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config("read_config_file", format!("{}: {e}", path.display())))?;
        let mut config = Self::from_toml(&contents)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Loads configuration the way the CLI does.
    ///
    /// Uses `explicit` if given, else `FOCUSGRID_CONFIG_PATH`, else the first
    /// config file found in the default locations, else defaults. Environment
    /// overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an explicitly named file cannot be loaded
    /// or an environment override is invalid. Files found in default locations
    /// that fail to parse are skipped with a warning.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_with_env(explicit, |key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load), reading the environment through `env`.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn load_with_env(
        explicit: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let from_env = env(CONFIG_PATH_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };
        config.apply_env_overrides(env)?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/focusgrid/` on macOS)
    /// 2. XDG config dir (`~/.config/focusgrid/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let candidates = [
            base_dirs.config_dir().join("focusgrid").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("focusgrid")
                .join("config.toml"),
        ];
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable config file");
                },
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `FocusgridConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(storage) = file.storage {
            if let Some(backend) = storage.backend {
                config.storage.backend = parse_backend(&backend)?;
            }
            if let Some(data_dir) = storage.data_dir {
                config.storage.data_dir = expand_home(&data_dir);
            }
            if let Some(users_file) = storage.users_file {
                config.storage.users_file = PathBuf::from(users_file);
            }
            if let Some(scores_file) = storage.scores_file {
                config.storage.scores_file = PathBuf::from(scores_file);
            }
            if let Some(database) = storage.database {
                config.storage.database = database;
            }
        }
        if let Some(game) = file.game {
            if let Some(game_types) = game.game_types {
                config.game.game_types = game_types;
            }
            if let Some(limit) = game.default_limit {
                config.game.default_limit = limit;
            }
            if let Some(limit) = game.max_limit {
                config.game.max_limit = limit;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }
        if let Some(metrics) = file.metrics {
            config.metrics = metrics;
        }

        config.validate()?;
        Ok(config)
    }

    /// Applies `FOCUSGRID_*` overrides read through `env`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unknown backend name or a port that
    /// is not a number.
    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(backend) = var("FOCUSGRID_BACKEND") {
            self.storage.backend = parse_backend(&backend)?;
        }
        if let Some(dir) = var("FOCUSGRID_DATA_DIR") {
            self.storage.data_dir = expand_home(&dir);
        }
        if let Some(level) = var("FOCUSGRID_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        if let Some(format) = var("FOCUSGRID_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(enabled) = var("FOCUSGRID_METRICS_ENABLED") {
            self.metrics.enabled = Some(parse_bool(&enabled));
        }
        if let Some(port) = var("FOCUSGRID_METRICS_PORT") {
            let port = port
                .parse::<u16>()
                .map_err(|e| Error::config("parse_metrics_port", format!("{port}: {e}")))?;
            self.metrics.port = Some(port);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.game.game_types.is_empty() {
            return Err(Error::config(
                "validate_config",
                "game.game_types must name at least one game",
            ));
        }
        if self.game.max_limit == 0 || self.game.default_limit == 0 {
            return Err(Error::config(
                "validate_config",
                "game.default_limit and game.max_limit must be positive",
            ));
        }
        Ok(())
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = path.into();
        self
    }

    /// Sets the storage backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: BackendType) -> Self {
        self.storage.backend = backend;
        self
    }
}

fn parse_backend(value: &str) -> Result<BackendType> {
    BackendType::parse(value).ok_or_else(|| {
        Error::config(
            "parse_storage_backend",
            format!("unknown backend '{value}' (expected memory, file or sqlite)"),
        )
    })
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "focusgrid")
        .map_or_else(|| PathBuf::from(".focusgrid"), |dirs| dirs.data_dir().to_path_buf())
}

fn expand_home(path: &str) -> PathBuf {
    let home = || directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf());
    match path.strip_prefix("~/") {
        Some(rest) => home().map_or_else(|| PathBuf::from(path), |h| h.join(rest)),
        None if path == "~" => home().unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
