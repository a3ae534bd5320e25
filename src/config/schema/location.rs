use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// General-purpose location forwarding thresholds.
///
/// Two postures exist; the emergency posture uses the smaller interval and
/// displacement so that movement is reported more eagerly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    #[serde(default = "default_normal_interval_ms")]
    pub normal_interval_ms: u64,
    #[serde(default = "default_normal_min_distance_m")]
    pub normal_min_distance_m: f64,
    #[serde(default = "default_emergency_interval_ms")]
    pub emergency_interval_ms: u64,
    #[serde(default = "default_emergency_min_distance_m")]
    pub emergency_min_distance_m: f64,
    /// Start in the emergency posture.
    #[serde(default)]
    pub emergency_posture: bool,
}

fn default_normal_interval_ms() -> u64 {
    15 * 60 * 1000
}

fn default_normal_min_distance_m() -> f64 {
    100.0
}

fn default_emergency_interval_ms() -> u64 {
    30 * 1000
}

fn default_emergency_min_distance_m() -> f64 {
    10.0
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            normal_interval_ms: default_normal_interval_ms(),
            normal_min_distance_m: default_normal_min_distance_m(),
            emergency_interval_ms: default_emergency_interval_ms(),
            emergency_min_distance_m: default_emergency_min_distance_m(),
            emergency_posture: false,
        }
    }
}

impl LocationConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.normal_min_distance_m < 0.0 || self.emergency_min_distance_m < 0.0 {
            return Err(ConfigError::Validation(
                "location min distances must be >= 0".into(),
            ));
        }
        if self.emergency_interval_ms > self.normal_interval_ms {
            return Err(ConfigError::Validation(
                "location.emergency_interval_ms must not exceed normal_interval_ms".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyConfig {
    /// Ping period when `emergency-mode:on` carries no interval.
    #[serde(default = "default_ping_interval_ms")]
    pub default_ping_interval_ms: u64,
    /// Lower bound applied to intervals supplied by the server.
    #[serde(default = "default_min_ping_interval_ms")]
    pub min_ping_interval_ms: u64,
}

fn default_ping_interval_ms() -> u64 {
    30_000
}

fn default_min_ping_interval_ms() -> u64 {
    1_000
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            default_ping_interval_ms: default_ping_interval_ms(),
            min_ping_interval_ms: default_min_ping_interval_ms(),
        }
    }
}

impl EmergencyConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.min_ping_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "emergency.min_ping_interval_ms must be > 0".into(),
            ));
        }
        if self.default_ping_interval_ms < self.min_ping_interval_ms {
            return Err(ConfigError::Validation(
                "emergency.default_ping_interval_ms is below min_ping_interval_ms".into(),
            ));
        }
        Ok(())
    }
}
