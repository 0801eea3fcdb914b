//! Configuration management for Naiad
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{NaiadError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Utility portal account configuration
    pub portal: PortalConfig,

    /// IANA timezone the utility reports wall-clock readings in
    pub timezone: String,

    /// Update cycle configuration
    pub update: UpdateConfig,

    /// Point/statistics store configuration
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Utility portal account parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Water district name as shown on the portal
    pub district: String,

    /// Account username (email)
    pub username: String,

    /// Account password
    pub password: String,

    /// HTTP request timeout in seconds
    pub request_timeout_secs: u64,
}

/// Update cycle parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Polling interval in hours. The portal refreshes its data every
    /// 12 to 24 hours, so anything below that only re-reads cursors.
    pub interval_hours: u64,

    /// Cooldown window for coalescing manual refresh requests, in milliseconds
    pub refresh_cooldown_ms: u64,

    /// Max login/fetch attempts per stream per cycle
    pub max_attempts: u32,

    /// Delay between retries in seconds
    pub retry_delay_secs: f64,
}

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the JSON-backed point/statistics store
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file or directory
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    #[serde(default = "default_true")]
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            district: String::new(),
            username: String::new(),
            password: String::new(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            interval_hours: 6,
            refresh_cooldown_ms: 300,
            max_attempts: 3,
            retry_delay_secs: 0.5,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "/data/naiad_store.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: "/tmp/naiad.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            portal: PortalConfig::default(),
            timezone: "UTC".to_string(),
            update: UpdateConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations
    pub fn load() -> Result<Self> {
        let default_paths = [
            "naiad_config.yaml",
            "/data/naiad_config.yaml",
            "/etc/naiad/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.portal.district.is_empty() {
            return Err(NaiadError::validation(
                "portal.district",
                "District name cannot be empty",
            ));
        }

        if self.portal.username.is_empty() {
            return Err(NaiadError::validation(
                "portal.username",
                "Username cannot be empty",
            ));
        }

        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(NaiadError::validation(
                "timezone",
                "Not a valid IANA timezone",
            ));
        }

        if self.update.interval_hours == 0 {
            return Err(NaiadError::validation(
                "update.interval_hours",
                "Must be greater than 0",
            ));
        }

        if self.update.max_attempts == 0 {
            return Err(NaiadError::validation(
                "update.max_attempts",
                "Must be greater than 0",
            ));
        }

        if self.store.path.is_empty() {
            return Err(NaiadError::validation(
                "store.path",
                "Store path cannot be empty",
            ));
        }

        Ok(())
    }
}
