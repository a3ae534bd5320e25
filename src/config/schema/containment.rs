use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Which foreground signal drives enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementBackend {
    /// Foreground-window change notifications.
    Event,
    /// Periodic most-recently-used queries.
    Polling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainmentConfig {
    #[serde(default = "default_backend")]
    pub backend: EnforcementBackend,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Trailing window of usage samples considered by the polling backend.
    #[serde(default = "default_usage_window_ms")]
    pub usage_window_ms: u64,
    /// Repeated blocks of the same package inside this window are dropped.
    #[serde(default = "default_block_cooldown_ms")]
    pub block_cooldown_ms: u64,
    /// Length of a `permissive-mode` grant.
    #[serde(default = "default_permissive_grant_ms")]
    pub permissive_grant_ms: u64,
    /// Whitelist installed input methods. Unset means "backend default".
    #[serde(default)]
    pub include_input_methods: Option<bool>,
}

fn default_backend() -> EnforcementBackend {
    EnforcementBackend::Polling
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_usage_window_ms() -> u64 {
    10_000
}

fn default_block_cooldown_ms() -> u64 {
    1_000
}

fn default_permissive_grant_ms() -> u64 {
    10 * 60 * 1000
}

impl Default for ContainmentConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            poll_interval_ms: default_poll_interval_ms(),
            usage_window_ms: default_usage_window_ms(),
            block_cooldown_ms: default_block_cooldown_ms(),
            permissive_grant_ms: default_permissive_grant_ms(),
            include_input_methods: None,
        }
    }
}

impl ContainmentConfig {
    /// The polling backend whitelists keyboards by default; the event backend does not.
    pub fn include_input_methods(&self) -> bool {
        self.include_input_methods
            .unwrap_or(self.backend == EnforcementBackend::Polling)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "containment.poll_interval_ms must be > 0".into(),
            ));
        }
        if self.usage_window_ms == 0 {
            return Err(ConfigError::Validation(
                "containment.usage_window_ms must be > 0".into(),
            ));
        }
        if self.permissive_grant_ms == 0 {
            return Err(ConfigError::Validation(
                "containment.permissive_grant_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}
