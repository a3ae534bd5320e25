use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// "log" | "buffer" | "none"
    #[serde(default = "default_audit_backend")]
    pub audit_backend: String,
    /// Capacity of the buffered audit sink.
    #[serde(default = "default_audit_buffer")]
    pub audit_buffer: usize,
}

fn default_log_level() -> String {
    "info".into()
}

fn default_audit_backend() -> String {
    "log".into()
}

fn default_audit_buffer() -> usize {
    500
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            audit_backend: default_audit_backend(),
            audit_buffer: default_audit_buffer(),
        }
    }
}

impl ObservabilityConfig {
    pub fn level(&self) -> tracing::Level {
        tracing::Level::from_str(&self.log_level).unwrap_or(tracing::Level::INFO)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if tracing::Level::from_str(&self.log_level).is_err() {
            return Err(ConfigError::Validation(format!(
                "observability.log_level `{}` is not a log level",
                self.log_level
            )));
        }
        Ok(())
    }
}
