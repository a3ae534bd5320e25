//! Device collaborators.
//!
//! Everything the engine needs from the platform is a trait here. A
//! [`Platform`] bundles one handle per collaborator and is passed explicitly
//! to every component instead of reaching for process-wide singletons.

pub mod capability;
pub mod config;
pub mod intent;
pub mod traits;

pub use capability::{Capabilities, PlatformTier, PrivilegeTier};
pub use config::{AppPermissionPolicy, Application, ConfigProvider, DeviceConfig, DeviceConfigSource};
pub use intent::{ExtraValue, IntentFlags, LaunchIntent};
pub use traits::{
    ActivityLauncher, AlertTone, AudioControl, AudioStream, CapabilityProbe, DevicePolicy,
    InstallManager, LocationSource, LockTaskFeatures, PackageManager, PlatformResult, Presenter,
    ShellRunner, TelemetryUplink, UsageSample, UsageStats, WifiManager,
};

use std::sync::Arc;

/// Dependency-injected platform handle.
#[derive(Clone)]
pub struct Platform {
    pub policy: Arc<dyn DevicePolicy>,
    pub packages: Arc<dyn PackageManager>,
    pub launcher: Arc<dyn ActivityLauncher>,
    pub presenter: Arc<dyn Presenter>,
    pub installer: Arc<dyn InstallManager>,
    pub audio: Arc<dyn AudioControl>,
    pub location: Arc<dyn LocationSource>,
    pub usage: Arc<dyn UsageStats>,
    pub wifi: Arc<dyn WifiManager>,
    pub shell: Arc<dyn ShellRunner>,
    pub uplink: Arc<dyn TelemetryUplink>,
    pub probe: Arc<dyn CapabilityProbe>,
}
