//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/heliograph/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/heliograph/` (~/.config/heliograph/)
//! - Data: `$XDG_DATA_HOME/heliograph/` (~/.local/share/heliograph/)
//! - State/Logs: `$XDG_STATE_HOME/heliograph/` (~/.local/state/heliograph/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Telemetry backend configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Telemetry backend configuration
///
/// Each configured key yields one backend client; with no keys telemetry
/// still enriches events locally but delivers nothing.
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Connection key for the primary backend route
    pub primary_key: Option<String>,

    /// Connection key for the alternate backend route
    pub alternate_key: Option<String>,

    /// Collector base URL (e.g., `https://telemetry.example.com`)
    pub endpoint: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_telemetry_timeout")]
    pub timeout_secs: u64,

    /// Re-issue platform identity lookups even when a cached value exists.
    /// The refreshed value only updates the store; published properties
    /// keep the cached value for the rest of the process lifetime.
    #[serde(default)]
    pub revalidate_identity: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            primary_key: None,
            alternate_key: None,
            endpoint: None,
            timeout_secs: default_telemetry_timeout(),
            revalidate_identity: false,
        }
    }
}

impl TelemetryConfig {
    /// Connection keys with a backend behind them, in route order.
    /// Empty strings count as unconfigured.
    pub fn backend_keys(&self) -> Vec<&str> {
        [self.primary_key.as_deref(), self.alternate_key.as_deref()]
            .into_iter()
            .flatten()
            .filter(|key| !key.is_empty())
            .collect()
    }

    /// Check if at least one backend is fully configured
    pub fn is_ready(&self) -> bool {
        !self.backend_keys().is_empty()
            && self.endpoint.as_deref().is_some_and(|url| !url.is_empty())
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.backend_keys().is_empty() {
            return Ok(());
        }

        if self.endpoint.as_deref().unwrap_or("").is_empty() {
            return Err(Error::Config(
                "telemetry.endpoint is required when a backend key is configured".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "telemetry.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_telemetry_timeout() -> u64 {
    30
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/heliograph/config.toml` (~/.config/heliograph/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("heliograph").join("config.toml")
    }

    /// Returns the data directory path (for the session store)
    ///
    /// `$XDG_DATA_HOME/heliograph/` (~/.local/share/heliograph/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("heliograph")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/heliograph/` (~/.local/state/heliograph/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("heliograph")
    }

    /// Returns the session store database path
    ///
    /// `$XDG_DATA_HOME/heliograph/session.db` (~/.local/share/heliograph/session.db)
    pub fn database_path() -> PathBuf {
        Self::data_dir().join("session.db")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/heliograph/heliograph.log` (~/.local/state/heliograph/heliograph.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("heliograph.log")
    }
}
