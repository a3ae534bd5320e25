use super::traits::CapabilityProbe;
use serde::Serialize;
use strum::Display;

/// First platform level with network suggestions and the newer policy APIs.
pub const MODERN_SDK: u32 = 29;
pub const PRIORITY_HINT_SDK: u32 = 30;
pub const LOCK_TASK_FEATURES_SDK: u32 = 28;
pub const CLEAR_APP_DATA_SDK: u32 = 28;
pub const KEYGUARD_CONTROL_SDK: u32 = 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeTier {
    /// Device-owner management privilege.
    Elevated,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlatformTier {
    Modern,
    Legacy,
}

/// Capabilities detected once at startup. Everything downstream dispatches
/// on these instead of probing versions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub privilege: PrivilegeTier,
    pub platform: PlatformTier,
    pub sdk_level: u32,
}

impl Capabilities {
    pub fn new(device_owner: bool, sdk_level: u32) -> Self {
        Self {
            privilege: if device_owner {
                PrivilegeTier::Elevated
            } else {
                PrivilegeTier::Standard
            },
            platform: if sdk_level >= MODERN_SDK {
                PlatformTier::Modern
            } else {
                PlatformTier::Legacy
            },
            sdk_level,
        }
    }

    pub fn detect(probe: &dyn CapabilityProbe) -> Self {
        let caps = Self::new(probe.is_device_owner(), probe.sdk_level());
        tracing::info!(
            privilege = %caps.privilege,
            platform = %caps.platform,
            sdk = caps.sdk_level,
            "capabilities detected"
        );
        caps
    }

    pub fn is_elevated(&self) -> bool {
        self.privilege == PrivilegeTier::Elevated
    }

    pub fn is_modern(&self) -> bool {
        self.platform == PlatformTier::Modern
    }

    pub fn supports_priority_hint(&self) -> bool {
        self.sdk_level >= PRIORITY_HINT_SDK
    }

    pub fn supports_lock_task_features(&self) -> bool {
        self.sdk_level >= LOCK_TASK_FEATURES_SDK
    }

    pub fn supports_clear_app_data(&self) -> bool {
        self.sdk_level >= CLEAR_APP_DATA_SDK
    }

    pub fn supports_keyguard_control(&self) -> bool {
        self.is_elevated() && self.sdk_level >= KEYGUARD_CONTROL_SDK
    }

    /// Connectivity may be switched on programmatically.
    pub fn may_enable_wifi(&self) -> bool {
        self.is_elevated() || !self.is_modern()
    }
}
