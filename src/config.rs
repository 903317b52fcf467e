//! Configuration management for Faraday
//!
//! Loads and validates the application configuration from YAML files.
//! Analytics thresholds are deliberately not configurable; they are fixed
//! policy constants in [`crate::analytics`].

use crate::error::{FaradayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Durable session log storage
    pub storage: StorageConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Client-side row sender configuration
    pub sender: SenderConfig,
}

/// Durable storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for per-(vehicle, day) session logs
    pub data_dir: String,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARNING, ERROR)
    pub level: String,

    /// Path to log file; empty disables file logging
    pub file: String,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Client-side row sender settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Path of the local reject log
    pub rejects_file: String,

    /// Abort the remaining stream on a transport fault instead of continuing
    pub abort_on_transport_fault: bool,

    /// Simulate a mid-stream disconnection after this many rows (0 disables)
    pub fail_after_rows: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
        }
    }
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            file: String::new(),
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            rejects_file: "rejects.csv".to_string(),
            abort_on_transport_fault: true,
            fail_after_rows: 0,
        }
    }
}

impl Config {
    /// Load configuration from default locations, falling back to defaults
    pub fn load() -> Result<Self> {
        let default_paths = [
            "faraday_config.yaml",
            "/data/faraday_config.yaml",
            "/etc/faraday/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Load configuration from a specific YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(FaradayError::config("storage.data_dir cannot be empty"));
        }

        if self.web.host.is_empty() {
            return Err(FaradayError::config("web.host cannot be empty"));
        }

        if self.web.port == 0 {
            return Err(FaradayError::config("web.port must be greater than 0"));
        }

        if self.sender.rejects_file.trim().is_empty() {
            return Err(FaradayError::config("sender.rejects_file cannot be empty"));
        }

        Ok(())
    }
}
