use super::super::{
    ContainmentConfig, EmergencyConfig, HostConfig, LocationConfig, ObservabilityConfig,
    PresentationConfig, UplinkConfig,
};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub containment: ContainmentConfig,

    #[serde(default)]
    pub location: LocationConfig,

    #[serde(default)]
    pub emergency: EmergencyConfig,

    #[serde(default)]
    pub presentation: PresentationConfig,

    #[serde(default)]
    pub uplink: UplinkConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub host: HostConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config.toml"),
            agent: AgentConfig::default(),
            storage: StorageConfig::default(),
            containment: ContainmentConfig::default(),
            location: LocationConfig::default(),
            emergency: EmergencyConfig::default(),
            presentation: PresentationConfig::default(),
            uplink: UplinkConfig::default(),
            observability: ObservabilityConfig::default(),
            host: HostConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.package.trim().is_empty() {
            return Err(ConfigError::Validation("agent.package must not be empty".into()));
        }
        if self.agent.system_ui_package.trim().is_empty() {
            return Err(ConfigError::Validation(
                "agent.system_ui_package must not be empty".into(),
            ));
        }
        self.containment.validate()?;
        self.location.validate()?;
        self.emergency.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

/// Identity of this agent on the device and towards the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_package")]
    pub package: String,
    #[serde(default = "default_system_ui_package")]
    pub system_ui_package: String,
    #[serde(default = "default_project")]
    pub project: String,
    /// Falls back to the host name when unset.
    #[serde(default)]
    pub device_id: Option<String>,
}

fn default_package() -> String {
    "com.hmdm.launcher".into()
}

fn default_system_ui_package() -> String {
    "com.android.systemui".into()
}

fn default_project() -> String {
    "default".into()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            package: default_package(),
            system_ui_package: default_system_ui_package(),
            project: default_project(),
            device_id: None,
        }
    }
}

impl AgentConfig {
    pub fn device_id(&self) -> String {
        if let Some(id) = self.device_id.as_deref()
            && !id.trim().is_empty()
        {
            return id.to_string();
        }
        hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown-device".into())
    }
}

/// On-disk locations. All paths accept a leading `~`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage readable before the user unlocks the device.
    #[serde(default = "default_boot_dir")]
    pub boot_dir: String,
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
    /// Root that file commands (`delete-file`, `purge-dir`, ...) resolve against.
    #[serde(default = "default_external_root")]
    pub external_root: String,
    /// Device configuration cache written by the config fetcher.
    #[serde(default = "default_device_config_path")]
    pub device_config_path: String,
}

fn default_boot_dir() -> String {
    "~/.kioskd/boot".into()
}

fn default_state_dir() -> String {
    "~/.kioskd/state".into()
}

fn default_external_root() -> String {
    "~/.kioskd/storage".into()
}

fn default_device_config_path() -> String {
    "~/.kioskd/state/device_config.json".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            boot_dir: default_boot_dir(),
            state_dir: default_state_dir(),
            external_root: default_external_root(),
            device_config_path: default_device_config_path(),
        }
    }
}

impl StorageConfig {
    pub fn boot_dir(&self) -> PathBuf {
        expand(&self.boot_dir)
    }

    pub fn state_dir(&self) -> PathBuf {
        expand(&self.state_dir)
    }

    pub fn external_root(&self) -> PathBuf {
        expand(&self.external_root)
    }

    pub fn device_config_path(&self) -> PathBuf {
        expand(&self.device_config_path)
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
