//! Configuration for the probe exporter.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Probe settings.
    #[serde(default)]
    pub probe: ProbeConfig,

    /// HTTP endpoint settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How exports are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProbeStrategy {
    /// One `nfs-ls` call per target.
    #[default]
    Direct,
    /// One `showmount -e` call per host, paths checked against the export list.
    ExportList,
}

impl ProbeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeStrategy::Direct => "direct",
            ProbeStrategy::ExportList => "export-list",
        }
    }
}

impl std::str::FromStr for ProbeStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ProbeStrategy::Direct),
            "export-list" => Ok(ProbeStrategy::ExportList),
            other => Err(ConfigError::Validation(format!(
                "Unknown probe strategy: {other} (expected direct or export-list)"
            ))),
        }
    }
}

/// Probe execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Probe strategy (default: "direct").
    #[serde(default)]
    pub strategy: ProbeStrategy,

    /// NFS listing tool for the direct strategy (default: "nfs-ls").
    #[serde(default = "default_nfs_ls_command")]
    pub nfs_ls_command: String,

    /// Export listing tool for the export-list strategy (default: "showmount").
    #[serde(default = "default_showmount_command")]
    pub showmount_command: String,

    /// Upper bound for each tool invocation (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_nfs_ls_command() -> String {
    "nfs-ls".to_string()
}

fn default_showmount_command() -> String {
    "showmount".to_string()
}

fn default_timeout() -> u64 {
    10
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            strategy: ProbeStrategy::default(),
            nfs_ls_command: default_nfs_ls_command(),
            showmount_command: default_showmount_command(),
            timeout_secs: default_timeout(),
        }
    }
}

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Path answering scrapes (default: "/").
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "timeout_secs must be > 0".to_string(),
            ));
        }

        if self.probe.nfs_ls_command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "nfs_ls_command must not be empty".to_string(),
            ));
        }

        if self.probe.showmount_command.trim().is_empty() {
            return Err(ConfigError::Validation(
                "showmount_command must not be empty".to_string(),
            ));
        }

        if !self.http.path.starts_with('/') {
            return Err(ConfigError::Validation(
                "Probe path must start with /".to_string(),
            ));
        }

        if self.http.path == "/health" {
            return Err(ConfigError::Validation(
                "Probe path must not be /health".to_string(),
            ));
        }

        Ok(())
    }
}
