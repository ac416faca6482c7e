use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Battery level sent when the caller has no reading of its own.
pub const DEFAULT_BATTERY_LEVEL: i64 = 75;

/// CPU is modelled as running this many degrees above the battery for
/// scenario submissions.
pub const CPU_TEMP_OFFSET_C: f64 = 5.0;

/// Page size for `GET /api/advice/history`.
pub const HISTORY_PAGE_SIZE: usize = 20;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_battery_level")]
    pub default_battery_level: i64,
    #[serde(default = "default_cpu_offset")]
    pub cpu_temp_offset_c: f64,
    /// Left unset, the transport's own timeout behaviour applies.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_history_limit() -> usize {
    HISTORY_PAGE_SIZE
}

fn default_battery_level() -> i64 {
    DEFAULT_BATTERY_LEVEL
}

fn default_cpu_offset() -> f64 {
    CPU_TEMP_OFFSET_C
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self::default_local()
    }
}

impl AdvisoryConfig {
    pub fn default_local() -> Self {
        Self {
            base_url: default_base_url(),
            history_limit: HISTORY_PAGE_SIZE,
            default_battery_level: DEFAULT_BATTERY_LEVEL,
            cpu_temp_offset_c: CPU_TEMP_OFFSET_C,
            request_timeout_secs: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }
        if self.history_limit == 0 {
            return Err(ConfigError::Invalid("history_limit must be at least 1".into()));
        }
        if !self.cpu_temp_offset_c.is_finite() {
            return Err(ConfigError::Invalid("cpu_temp_offset_c must be finite".into()));
        }
        Ok(())
    }
}
