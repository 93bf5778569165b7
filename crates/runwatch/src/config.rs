//! Configuration loading from file and environment variables.

use std::time::Duration;

use runwatch_engine::PollSettings;
use runwatch_github::GithubSettings;
use serde::Deserialize;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// GitHub API access.
    #[serde(default)]
    pub github: GithubConfig,

    /// Loop timing.
    #[serde(default)]
    pub poll: PollConfig,

    /// Watermark persistence.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub API access settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    /// API root (override for GitHub Enterprise).
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Most recently updated runs inspected per poll.
    #[serde(default = "default_window")]
    pub window: u32,

    /// Connection establishment limit, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request limit, in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Reconciliation loop timing.
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Seconds between successful polls.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Seconds to wait after a failed poll.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
}

/// Which checkpoint medium to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    /// TOML text file.
    #[default]
    File,
    /// SQLite database.
    Sqlite,
}

impl std::str::FromStr for CheckpointBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown checkpoint backend: {other}")),
        }
    }
}

/// Watermark persistence settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub backend: CheckpointBackend,

    /// Path of the state file or database.
    #[serde(default = "default_checkpoint_path")]
    pub path: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "runwatch_engine=debug,warn").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_api_url() -> String {
    runwatch_github::DEFAULT_API_URL.to_string()
}

fn default_window() -> u32 {
    10
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_interval_secs() -> u64 {
    10
}

fn default_backoff_secs() -> u64 {
    5
}

fn default_checkpoint_path() -> String {
    ".runwatch_state.toml".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            window: default_window(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            backoff_secs: default_backoff_secs(),
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::default(),
            path: default_checkpoint_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl GithubConfig {
    /// Converts to client settings.
    pub fn settings(&self) -> GithubSettings {
        GithubSettings {
            api_url: self.api_url.clone(),
            window: self.window,
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

impl PollConfig {
    /// Converts to loop settings. Zero intervals are raised to one second.
    pub fn settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.interval_secs.max(1)),
            backoff: Duration::from_secs(self.backoff_secs.max(1)),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where the settings in a loaded [`Config`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// The configuration file was read.
    File,
    /// No file was given or it does not exist.
    Defaults,
}

impl ConfigOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Defaults => "defaults",
        }
    }
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Runs before logging is set up, so it reports how the file was resolved
/// through [`ConfigOrigin`] instead of logging.
///
/// Environment variable overrides:
/// - `RUNWATCH_API_URL` overrides `github.api_url`
/// - `RUNWATCH_WINDOW` overrides `github.window`
/// - `RUNWATCH_POLL_INTERVAL_SECS` overrides `poll.interval_secs`
/// - `RUNWATCH_CHECKPOINT_BACKEND` overrides `checkpoint.backend`
/// - `RUNWATCH_CHECKPOINT_PATH` overrides `checkpoint.path`
/// - `RUNWATCH_LOG_LEVEL` overrides `logging.level`
/// - `RUNWATCH_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<(Config, ConfigOrigin), ConfigError> {
    let (mut config, origin) = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => (toml::from_str(&contents)?, ConfigOrigin::File),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Config::default(), ConfigOrigin::Defaults)
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => (Config::default(), ConfigOrigin::Defaults),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok((config, origin))
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(url) = var("RUNWATCH_API_URL") {
        config.github.api_url = url;
    }
    if let Some(window) = var("RUNWATCH_WINDOW") {
        if let Ok(parsed) = window.parse() {
            config.github.window = parsed;
        }
    }
    if let Some(interval) = var("RUNWATCH_POLL_INTERVAL_SECS") {
        if let Ok(parsed) = interval.parse() {
            config.poll.interval_secs = parsed;
        }
    }
    if let Some(backend) = var("RUNWATCH_CHECKPOINT_BACKEND") {
        if let Ok(parsed) = backend.parse() {
            config.checkpoint.backend = parsed;
        }
    }
    if let Some(path) = var("RUNWATCH_CHECKPOINT_PATH") {
        config.checkpoint.path = path;
    }
    if let Some(level) = var("RUNWATCH_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("RUNWATCH_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
