//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `homerunner.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::Deserialize;

use homerunner_adapter_hass_reqwest::HassConfig;
use homerunner_app::runner::RunnerConfig;
use homerunner_app::runner::policy::{ErrorBudget, ErrorPolicy, LogThrottle};

/// Accepted per-runner history sizes.
const HISTORY_CAPACITY: RangeInclusive<usize> = 50..=100;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Hub connection and credentials.
    pub hub: HassConfig,
    /// Runner timings and limits.
    pub runner: RunnerSection,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Runner timings and limits.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerSection {
    pub motion_poll_interval_ms: u64,
    pub alarm_poll_interval_secs: u64,
    pub arm_settle_delay_secs: u64,
    pub history_capacity: usize,
    pub debug_history_limit: usize,
    /// Consecutive failed polls before a runner stops itself.
    pub max_consecutive_errors: u32,
    /// Log every n-th repeated failure (the first is always logged).
    pub log_every: u32,
}

impl Config {
    /// Load configuration from `homerunner.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("homerunner.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("HOMERUNNER_HOST") {
            self.server.host = val;
        }
        if let Some(port) = lookup("HOMERUNNER_PORT").and_then(|val| val.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = lookup("HOMERUNNER_BIND") {
            if let Some((host, port)) = val.rsplit_once(':') {
                self.server.host = host.to_string();
                if let Ok(port) = port.parse() {
                    self.server.port = port;
                }
            }
        }
        if let Some(val) = lookup("HOMERUNNER_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = lookup("HOMERUNNER_HUB_URL") {
            self.hub.base_url = val;
        }
        if let Some(val) = lookup("HOMERUNNER_HUB_TOKEN") {
            self.hub.token = val;
        }
        if let Some(val) = lookup("HOMERUNNER_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("port must be non-zero".to_string()));
        }
        if self.hub.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("hub base_url must not be empty".to_string()));
        }
        if self.hub.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "hub timeout_secs must be non-zero".to_string(),
            ));
        }
        if self.hub.token.trim().is_empty() {
            return Err(ConfigError::Validation(
                "hub token is required (set HOMERUNNER_HUB_TOKEN)".to_string(),
            ));
        }
        if self.runner.motion_poll_interval_ms == 0 || self.runner.alarm_poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "poll intervals must be non-zero".to_string(),
            ));
        }
        if !HISTORY_CAPACITY.contains(&self.runner.history_capacity) {
            return Err(ConfigError::Validation(format!(
                "history_capacity must be between {} and {}",
                HISTORY_CAPACITY.start(),
                HISTORY_CAPACITY.end()
            )));
        }
        if self.runner.max_consecutive_errors == 0 {
            return Err(ConfigError::Validation(
                "max_consecutive_errors must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }
}

impl RunnerSection {
    #[must_use]
    pub fn to_runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            motion_poll_interval: Duration::from_millis(self.motion_poll_interval_ms),
            alarm_poll_interval: Duration::from_secs(self.alarm_poll_interval_secs),
            arm_settle_delay: Duration::from_secs(self.arm_settle_delay_secs),
            history_capacity: self.history_capacity,
            debug_history_limit: self.debug_history_limit,
            error_policy: ErrorPolicy {
                budget: ErrorBudget {
                    max_consecutive_errors: self.max_consecutive_errors,
                },
                throttle: LogThrottle {
                    every: self.log_every,
                },
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:homerunner.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "homerunnerd=info,homerunner_app=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for RunnerSection {
    fn default() -> Self {
        let defaults = RunnerConfig::default();
        Self {
            motion_poll_interval_ms: 750,
            alarm_poll_interval_secs: 30,
            arm_settle_delay_secs: 5,
            history_capacity: defaults.history_capacity,
            debug_history_limit: defaults.debug_history_limit,
            max_consecutive_errors: defaults.error_policy.budget.max_consecutive_errors,
            log_every: defaults.error_policy.throttle.every,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
