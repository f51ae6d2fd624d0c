//! Daemon configuration: structs, parsing, and validation.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BIND_ADDRESS, DEFAULT_METRICS_PORT, DEFAULT_RECONCILE_INTERVAL_MS, DEFAULT_SPOOL_DIR,
    DEFAULT_SPOOL_POLL_SECS, DEFAULT_STATE_PATH,
};

// ── Config errors ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

fn validation(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.to_string(),
        message: message.into(),
    }
}

// ── Top-level config ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    pub agent: AgentInfo,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub spool: SpoolConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl AgentConfig {
    /// Load config from a YAML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config after deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.application.is_empty() {
            return Err(validation(
                "agent.application",
                "application name must not be empty (it is the leading topic segment)",
            ));
        }
        if self.agent.application.contains('/') {
            return Err(validation(
                "agent.application",
                "application name must not contain '/'",
            ));
        }
        if self.bus.client_id.is_empty() {
            return Err(validation("bus.client_id", "client id must not be empty"));
        }
        if self.spool.path.is_empty() {
            return Err(validation("spool.path", "spool directory must not be empty"));
        }
        if self.spool.poll_interval_secs == 0 {
            return Err(validation(
                "spool.poll_interval_secs",
                "poll interval must be at least 1 second",
            ));
        }
        if self.reconcile.interval_millis < 100 {
            return Err(validation(
                "reconcile.interval_millis",
                "reconcile interval must be at least 100ms",
            ));
        }
        if self.persistence.path.is_empty() {
            return Err(validation(
                "persistence.path",
                "snapshot path must not be empty",
            ));
        }
        Ok(())
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile.interval_millis)
    }

    pub fn spool_poll_interval(&self) -> Duration {
        Duration::from_secs(self.spool.poll_interval_secs)
    }
}

// ── Agent info ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    /// Application name: the leading segment of every published topic.
    pub application: String,

    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// IP address for the metrics listener to bind to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// ── Bus section ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Client identity: names the will topic and the control-channel
    /// topic prefix.
    #[serde(default = "default_client_id")]
    pub client_id: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
        }
    }
}

// ── Spool section ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolConfig {
    /// Directory scanned for inbound alert message files.
    #[serde(default = "default_spool_dir")]
    pub path: String,

    #[serde(default = "default_spool_poll")]
    pub poll_interval_secs: u64,
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            path: default_spool_dir(),
            poll_interval_secs: default_spool_poll(),
        }
    }
}

// ── Reconcile section ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Pause between cycles, measured from the end of the previous one.
    #[serde(default = "default_reconcile_interval")]
    pub interval_millis: u64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_millis: default_reconcile_interval(),
        }
    }
}

// ── Persistence section ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Path of the JSON snapshot file.
    #[serde(default = "default_state_path")]
    pub path: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}
fn default_log_format() -> LogFormat {
    LogFormat::Json
}
fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}
fn default_metrics_port() -> u16 {
    DEFAULT_METRICS_PORT
}
fn default_client_id() -> String {
    "andond".to_string()
}
fn default_spool_dir() -> String {
    DEFAULT_SPOOL_DIR.to_string()
}
fn default_spool_poll() -> u64 {
    DEFAULT_SPOOL_POLL_SECS
}
fn default_reconcile_interval() -> u64 {
    DEFAULT_RECONCILE_INTERVAL_MS
}
fn default_state_path() -> String {
    DEFAULT_STATE_PATH.to_string()
}

// ── Log level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(format!(
                "invalid log level '{s}': expected error|warn|info|debug|trace"
            )),
        }
    }
}

// ── Log format ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "pretty" => Ok(Self::Text),
            _ => Err(format!("invalid log format '{s}': expected json|text")),
        }
    }
}
