use crate::error::ConfigError;
use crate::wifi::WifiNetworkSpec;
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};

/// Runtime-permission policy applied by `grant-permissions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum AppPermissionPolicy {
    #[default]
    #[strum(serialize = "GRANTALL")]
    GrantAll,
    #[strum(serialize = "ASKLOCATION")]
    AskLocation,
    #[strum(serialize = "DENYLOCATION")]
    DenyLocation,
    #[strum(serialize = "ASKALL")]
    AskAll,
}

/// One managed application entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub pkg: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// "app" | "web" | ...
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Scheduled for removal; never whitelisted.
    #[serde(default)]
    pub remove: Option<bool>,
}

impl Application {
    pub fn package(&self) -> Option<&str> {
        self.pkg.as_deref().filter(|p| !p.is_empty())
    }

    pub fn is_removed(&self) -> bool {
        self.remove.unwrap_or(false)
    }

    /// Installable application: type `app` with a download URL.
    pub fn is_installable_app(&self) -> bool {
        self.kind.as_deref() == Some("app") && self.url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Managed configuration pushed by the server and cached by the HTTP
/// collaborator. Nullable flags are tolerated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub permissive: Option<bool>,
    #[serde(default)]
    pub kiosk_mode: Option<bool>,
    /// Package shown in kiosk mode.
    #[serde(default)]
    pub main_app: Option<String>,
    /// Hex digest of the unlock PIN.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub app_permissions: Option<String>,
    #[serde(default)]
    pub lock_volume: Option<bool>,
    #[serde(default)]
    pub wifi: Vec<WifiNetworkSpec>,
}

impl DeviceConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw)
            .map_err(|e| ConfigError::Load(format!("device configuration: {e}")))
    }

    pub fn applications(&self) -> &[Application] {
        &self.applications
    }

    pub fn is_permissive(&self) -> bool {
        self.permissive.unwrap_or(false)
    }

    pub fn is_kiosk_mode(&self) -> bool {
        self.kiosk_mode.unwrap_or(false)
    }

    pub fn password_hash(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// Unknown or missing policy falls back to grant-all.
    pub fn app_permissions(&self) -> AppPermissionPolicy {
        self.app_permissions
            .as_deref()
            .and_then(|raw| AppPermissionPolicy::from_str(raw).ok())
            .unwrap_or_default()
    }

    pub fn lock_volume(&self) -> bool {
        self.lock_volume.unwrap_or(false)
    }

    pub fn wifi_networks(&self) -> &[WifiNetworkSpec] {
        &self.wifi
    }
}

/// Read access to the current device configuration.
pub trait ConfigProvider: Send + Sync {
    /// `None` until a configuration has been received.
    fn current(&self) -> Option<Arc<DeviceConfig>>;
}

/// Lock-free holder of the latest device configuration, optionally backed
/// by the JSON cache file.
pub struct DeviceConfigSource {
    inner: ArcSwapOption<DeviceConfig>,
    path: Option<PathBuf>,
}

impl DeviceConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: ArcSwapOption::empty(),
            path: Some(path.into()),
        }
    }

    /// In-memory only.
    pub fn detached(config: Option<DeviceConfig>) -> Self {
        Self {
            inner: ArcSwapOption::new(config.map(Arc::new)),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-read the cache file. A missing file leaves the current snapshot
    /// untouched and returns it.
    pub fn reload(&self) -> Result<Option<Arc<DeviceConfig>>, ConfigError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(self.inner.load_full());
        };
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no cached device configuration");
            return Ok(self.inner.load_full());
        }
        let raw = std::fs::read_to_string(path)?;
        let config = Arc::new(DeviceConfig::from_json(&raw)?);
        self.inner.store(Some(config.clone()));
        tracing::info!(
            path = %path.display(),
            applications = config.applications.len(),
            networks = config.wifi.len(),
            "device configuration loaded"
        );
        Ok(Some(config))
    }

    pub fn store(&self, config: DeviceConfig) {
        self.inner.store(Some(Arc::new(config)));
    }

    pub fn clear(&self) {
        self.inner.store(None);
    }
}

impl ConfigProvider for DeviceConfigSource {
    fn current(&self) -> Option<Arc<DeviceConfig>> {
        self.inner.load_full()
    }
}
