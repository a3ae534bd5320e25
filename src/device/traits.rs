use crate::device::config::AppPermissionPolicy;
use crate::device::intent::LaunchIntent;
use crate::emergency::{LocationProvider, LocationSample};
use crate::error::PlatformError;
use crate::wifi::{NetworkDescriptor, Suggestion};
use async_trait::async_trait;
use std::ops::BitOr;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

// ── Device policy ────────────────────────────────────────────

/// System affordances left available while the restrictive running mode is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockTaskFeatures(u32);

impl LockTaskFeatures {
    pub const NONE: Self = Self(0);
    pub const SYSTEM_INFO: Self = Self(1);
    pub const NOTIFICATIONS: Self = Self(1 << 1);
    pub const HOME: Self = Self(1 << 2);
    pub const OVERVIEW: Self = Self(1 << 3);
    pub const GLOBAL_ACTIONS: Self = Self(1 << 4);
    pub const KEYGUARD: Self = Self(1 << 5);

    /// Features restored when the device leaves the locked state.
    pub const UNLOCKED_DEFAULT: Self = Self(
        Self::SYSTEM_INFO.0
            | Self::HOME.0
            | Self::NOTIFICATIONS.0
            | Self::GLOBAL_ACTIONS.0
            | Self::KEYGUARD.0,
    );

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for LockTaskFeatures {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Privileged device-management operations.
pub trait DevicePolicy: Send + Sync {
    fn set_lock_task_packages(&self, packages: &[String]) -> PlatformResult<()>;
    fn set_lock_task_features(&self, features: LockTaskFeatures) -> PlatformResult<()>;
    fn is_lock_task_permitted(&self, package: &str) -> bool;
    fn start_lock_task(&self) -> PlatformResult<()>;
    fn stop_lock_task(&self) -> PlatformResult<()>;
    fn is_lock_task_active(&self) -> bool;
    fn set_keyguard_disabled(&self, disabled: bool) -> PlatformResult<()>;
    /// Turn the screen on and hold it for `hold`.
    fn wake_screen(&self, hold: Duration) -> PlatformResult<()>;
    fn set_volume_locked(&self, locked: bool) -> PlatformResult<()>;
    fn is_volume_locked(&self) -> bool;
    /// Manual brightness through the policy path. Disables auto-brightness.
    fn set_brightness(&self, level: u8) -> PlatformResult<()>;
    fn reboot(&self) -> PlatformResult<()>;
    fn clear_app_data(&self, package: &str) -> PlatformResult<()>;
    fn grant_requested_permissions(
        &self,
        package: &str,
        policy: AppPermissionPolicy,
    ) -> PlatformResult<()>;
}

// ── Packages & activities ────────────────────────────────────

pub trait PackageManager: Send + Sync {
    /// Default launch target for `package`, if it has one.
    fn launch_intent_for(&self, package: &str) -> Option<LaunchIntent>;
    fn is_installed(&self, package: &str) -> bool;
    fn input_method_packages(&self) -> Vec<String>;
    /// Packages able to handle `intent`, in resolver order.
    fn handlers_for(&self, intent: &LaunchIntent) -> Vec<String>;
}

pub trait ActivityLauncher: Send + Sync {
    fn start_activity(&self, intent: &LaunchIntent) -> PlatformResult<()>;
    fn send_broadcast(&self, intent: &LaunchIntent) -> PlatformResult<()>;
    /// Bring the managed home surface to the foreground.
    fn bring_home_to_front(&self) -> PlatformResult<()>;
}

// ── Presentation ─────────────────────────────────────────────

/// Full-screen surfaces. Rendering is opaque; surfaces self-dismiss after
/// the given timeout or on tap.
pub trait Presenter: Send + Sync {
    fn show_lock_surface(&self) -> PlatformResult<()>;
    fn dismiss_lock_surface(&self) -> PlatformResult<()>;
    fn is_lock_surface_shown(&self) -> bool;
    fn show_attention(&self, timeout: Duration) -> PlatformResult<()>;
    fn show_message(&self, text: &str, timeout: Duration) -> PlatformResult<()>;
    fn show_admin_panel(&self) -> PlatformResult<()>;
}

// ── Install manager ──────────────────────────────────────────

#[async_trait]
pub trait InstallManager: Send + Sync {
    async fn uninstall(&self, package: &str) -> PlatformResult<()>;
    /// Files previously downloaded for installation.
    fn downloaded_files(&self) -> Vec<PathBuf>;
    fn forget_downloads(&self);
}

// ── Audio ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioStream {
    Alarm,
    Music,
    Ring,
}

/// A playing alert tone. Dropping without `stop` leaks the player.
pub trait AlertTone: Send {
    fn stop(self: Box<Self>);
}

pub trait AudioControl: Send + Sync {
    fn stream_volume(&self, stream: AudioStream) -> PlatformResult<u32>;
    fn max_stream_volume(&self, stream: AudioStream) -> PlatformResult<u32>;
    fn set_stream_volume(&self, stream: AudioStream, volume: u32) -> PlatformResult<()>;
    /// Primary media-volume control, 0..=100.
    fn set_volume_percent(&self, percent: u8) -> PlatformResult<()>;
    /// Start a looping high-priority alert tone.
    fn start_alert_tone(&self) -> PlatformResult<Box<dyn AlertTone>>;
}

// ── Sensors ──────────────────────────────────────────────────

pub trait LocationSource: Send + Sync {
    fn last_known(&self, provider: LocationProvider) -> Option<LocationSample>;
    /// Stream continuous updates from every provider into `sink`.
    /// Returns a registration id for [`LocationSource::remove_updates`].
    fn request_updates(
        &self,
        interval: Duration,
        sink: mpsc::UnboundedSender<LocationSample>,
    ) -> PlatformResult<u64>;
    fn remove_updates(&self, registration: u64);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSample {
    pub package: String,
    pub last_used_ms: i64,
}

pub trait UsageStats: Send + Sync {
    /// Usage samples between `from_ms` and `to_ms`. `None` when the
    /// platform has no data for the window.
    fn query(&self, from_ms: i64, to_ms: i64) -> Option<Vec<UsageSample>>;
}

// ── Connectivity ─────────────────────────────────────────────

pub trait WifiManager: Send + Sync {
    fn is_enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool) -> PlatformResult<()>;
    /// Add to the saved-network store with management privilege. Returns the network id.
    fn add_network_privileged(&self, descriptor: &NetworkDescriptor) -> PlatformResult<i32>;
    /// Legacy direct add. Returns the network id.
    fn add_network_legacy(&self, descriptor: &NetworkDescriptor) -> PlatformResult<i32>;
    fn enable_network(&self, network_id: i32) -> PlatformResult<bool>;
    fn save_configuration(&self) -> PlatformResult<()>;
    /// Suggestions previously submitted by this agent.
    fn network_suggestions(&self) -> PlatformResult<Vec<Suggestion>>;
    fn remove_suggestions(&self, suggestions: &[Suggestion]) -> PlatformResult<()>;
    /// Raw platform status code.
    fn add_suggestions(&self, suggestions: &[Suggestion]) -> PlatformResult<i32>;
}

// ── Out-of-process & network ─────────────────────────────────

#[async_trait]
pub trait ShellRunner: Send + Sync {
    /// Run `command`, returning combined output.
    async fn run(&self, command: &str) -> PlatformResult<String>;
}

#[async_trait]
pub trait TelemetryUplink: Send + Sync {
    async fn send_locations(
        &self,
        project: &str,
        device_id: &str,
        samples: &[LocationSample],
    ) -> anyhow::Result<()>;

    fn name(&self) -> &str;
}

// ── Capability probe ─────────────────────────────────────────

pub trait CapabilityProbe: Send + Sync {
    fn is_device_owner(&self) -> bool;
    fn sdk_level(&self) -> u32;
}
