//! Headless device used by the binary and by tests.
//!
//! Implements every collaborator trait against in-memory state and keeps a
//! journal of the side effects it was asked to perform.

use crate::config::HostConfig;
use crate::device::{
    ActivityLauncher, AlertTone, AppPermissionPolicy, AudioControl, AudioStream, CapabilityProbe,
    DevicePolicy, InstallManager, LaunchIntent, LocationSource, LockTaskFeatures, PackageManager,
    Platform, PlatformResult, Presenter, ShellRunner, TelemetryUplink, UsageSample, UsageStats,
    WifiManager,
};
use crate::emergency::{LocationProvider, LocationSample};
use crate::error::PlatformError;
use crate::wifi::{NetworkDescriptor, Suggestion};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

/// Default maximum index of every audio stream.
pub const DEFAULT_MAX_STREAM_VOLUME: u32 = 15;

/// Side effect requested from the device.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceAction {
    LockTaskPackages(Vec<String>),
    LockTaskFeatures(LockTaskFeatures),
    StartLockTask,
    StopLockTask,
    KeyguardDisabled(bool),
    WakeScreen(Duration),
    VolumeLocked(bool),
    VolumePercent(u8),
    StreamVolume(AudioStream, u32),
    AlertToneStarted,
    AlertToneStopped,
    Brightness(u8),
    Reboot,
    ClearAppData(String),
    GrantPermissions(String, AppPermissionPolicy),
    StartActivity(LaunchIntent),
    Broadcast(LaunchIntent),
    BringHomeToFront,
    ShowLockSurface,
    DismissLockSurface,
    ShowAttention(Duration),
    ShowMessage(String, Duration),
    ShowAdminPanel,
    Uninstall(String),
    ForgetDownloads,
    WifiEnabled(bool),
    AddNetworkPrivileged(NetworkDescriptor),
    AddNetworkLegacy(NetworkDescriptor),
    EnableNetwork(i32),
    SaveWifiConfiguration,
    RemoveSuggestions(usize),
    AddSuggestions(Vec<Suggestion>),
    Shell(String),
    RequestLocationUpdates(u64),
    RemoveLocationUpdates(u64),
}

/// Knobs that make individual operations fail.
#[derive(Debug, Default, Clone)]
pub struct FaultPlan {
    pub volume_control: bool,
    pub brightness_policy: bool,
    pub alert_tone: bool,
    pub add_network_for: HashSet<String>,
    /// Status code returned by `add_suggestions`.
    pub suggestion_status: i32,
}

#[derive(Default)]
struct HostState {
    journal: Vec<DeviceAction>,
    lock_task_packages: Vec<String>,
    lock_task_active: bool,
    volume_locked: bool,
    lock_surface_shown: bool,
    stream_volumes: HashMap<AudioStream, u32>,
    installed: HashSet<String>,
    input_methods: Vec<String>,
    usage: Vec<UsageSample>,
    last_known: HashMap<LocationProvider, LocationSample>,
    location_sinks: HashMap<u64, mpsc::UnboundedSender<LocationSample>>,
    downloads: Vec<PathBuf>,
    wifi_enabled: bool,
    next_network_id: i32,
    suggestions: Vec<Suggestion>,
    browsable_handlers: Vec<String>,
    faults: FaultPlan,
}

pub struct HostDevice {
    device_owner: AtomicBool,
    sdk_level: AtomicU64,
    state: Arc<Mutex<HostState>>,
    next_registration: AtomicU64,
}

impl HostDevice {
    pub fn new(device_owner: bool, sdk_level: u32) -> Self {
        let state = HostState {
            wifi_enabled: true,
            input_methods: vec!["com.android.inputmethod.latin".into()],
            ..HostState::default()
        };
        Self {
            device_owner: AtomicBool::new(device_owner),
            sdk_level: AtomicU64::new(u64::from(sdk_level)),
            state: Arc::new(Mutex::new(state)),
            next_registration: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &HostConfig) -> Self {
        let device = Self::new(config.device_owner, config.sdk_level);
        {
            let mut state = device.lock();
            state.installed = config.installed_packages.iter().cloned().collect();
            state.input_methods.clone_from(&config.input_methods);
            state.wifi_enabled = config.wifi_enabled;
            state.faults.volume_control = !config.volume_control;
            state.faults.brightness_policy = !config.brightness_policy;
        }
        device
    }

    /// Bundle this device into a [`Platform`].
    pub fn platform(
        self: &Arc<Self>,
        shell: Arc<dyn ShellRunner>,
        uplink: Arc<dyn TelemetryUplink>,
    ) -> Platform {
        Platform {
            policy: self.clone(),
            packages: self.clone(),
            launcher: self.clone(),
            presenter: self.clone(),
            installer: self.clone(),
            audio: self.clone(),
            location: self.clone(),
            usage: self.clone(),
            wifi: self.clone(),
            shell,
            uplink,
            probe: self.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn record(&self, action: DeviceAction) {
        tracing::debug!(?action, "host.action");
        self.lock().journal.push(action);
    }

    // ── Inspection ───────────────────────────────────────────

    pub fn journal(&self) -> Vec<DeviceAction> {
        self.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    pub fn count(&self, pred: impl Fn(&DeviceAction) -> bool) -> usize {
        self.lock().journal.iter().filter(|a| pred(a)).count()
    }

    pub fn stream_volume_of(&self, stream: AudioStream) -> u32 {
        self.lock().stream_volumes.get(&stream).copied().unwrap_or(0)
    }

    pub fn lock_task_packages(&self) -> Vec<String> {
        self.lock().lock_task_packages.clone()
    }

    pub fn location_registrations(&self) -> usize {
        self.lock().location_sinks.len()
    }

    // ── Scenario setup ───────────────────────────────────────

    pub fn set_device_owner(&self, owner: bool) {
        self.device_owner.store(owner, Ordering::SeqCst);
    }

    pub fn install(&self, package: &str) {
        self.lock().installed.insert(package.to_string());
    }

    pub fn set_browsable_handlers(&self, packages: &[&str]) {
        self.lock().browsable_handlers = packages.iter().map(|p| (*p).to_string()).collect();
    }

    pub fn set_stream_volume_raw(&self, stream: AudioStream, volume: u32) {
        self.lock().stream_volumes.insert(stream, volume);
    }

    pub fn set_volume_locked_raw(&self, locked: bool) {
        self.lock().volume_locked = locked;
    }

    pub fn set_wifi_enabled_raw(&self, enabled: bool) {
        self.lock().wifi_enabled = enabled;
    }

    pub fn push_suggestion_raw(&self, suggestion: Suggestion) {
        self.lock().suggestions.push(suggestion);
    }

    pub fn add_download(&self, path: PathBuf) {
        self.lock().downloads.push(path);
    }

    /// Report `package` as used at `at_ms`.
    pub fn use_app(&self, package: &str, at_ms: i64) {
        self.lock().usage.push(UsageSample {
            package: package.to_string(),
            last_used_ms: at_ms,
        });
    }

    pub fn set_last_known(&self, sample: LocationSample) {
        self.lock().last_known.insert(sample.provider, sample);
    }

    /// Deliver `sample` to every active update registration.
    pub fn emit_location(&self, sample: &LocationSample) {
        let state = self.lock();
        for sink in state.location_sinks.values() {
            let _ = sink.send(sample.clone());
        }
    }

    pub fn faults(&self, update: impl FnOnce(&mut FaultPlan)) {
        update(&mut self.lock().faults);
    }
}

impl Default for HostDevice {
    fn default() -> Self {
        Self::new(true, 33)
    }
}

// ── DevicePolicy ─────────────────────────────────────────────

impl DevicePolicy for HostDevice {
    fn set_lock_task_packages(&self, packages: &[String]) -> PlatformResult<()> {
        self.lock().lock_task_packages = packages.to_vec();
        self.record(DeviceAction::LockTaskPackages(packages.to_vec()));
        Ok(())
    }

    fn set_lock_task_features(&self, features: LockTaskFeatures) -> PlatformResult<()> {
        self.record(DeviceAction::LockTaskFeatures(features));
        Ok(())
    }

    fn is_lock_task_permitted(&self, package: &str) -> bool {
        self.lock().lock_task_packages.iter().any(|p| p == package)
    }

    fn start_lock_task(&self) -> PlatformResult<()> {
        self.lock().lock_task_active = true;
        self.record(DeviceAction::StartLockTask);
        Ok(())
    }

    fn stop_lock_task(&self) -> PlatformResult<()> {
        self.lock().lock_task_active = false;
        self.record(DeviceAction::StopLockTask);
        Ok(())
    }

    fn is_lock_task_active(&self) -> bool {
        self.lock().lock_task_active
    }

    fn set_keyguard_disabled(&self, disabled: bool) -> PlatformResult<()> {
        if !self.is_device_owner() {
            return Err(PlatformError::rejected("keyguard", "not device owner"));
        }
        self.record(DeviceAction::KeyguardDisabled(disabled));
        Ok(())
    }

    fn wake_screen(&self, hold: Duration) -> PlatformResult<()> {
        self.record(DeviceAction::WakeScreen(hold));
        Ok(())
    }

    fn set_volume_locked(&self, locked: bool) -> PlatformResult<()> {
        self.lock().volume_locked = locked;
        self.record(DeviceAction::VolumeLocked(locked));
        Ok(())
    }

    fn is_volume_locked(&self) -> bool {
        self.lock().volume_locked
    }

    fn set_brightness(&self, level: u8) -> PlatformResult<()> {
        if self.lock().faults.brightness_policy || !self.is_device_owner() {
            return Err(PlatformError::rejected("brightness", "policy unavailable"));
        }
        self.record(DeviceAction::Brightness(level));
        Ok(())
    }

    fn reboot(&self) -> PlatformResult<()> {
        self.record(DeviceAction::Reboot);
        Ok(())
    }

    fn clear_app_data(&self, package: &str) -> PlatformResult<()> {
        self.record(DeviceAction::ClearAppData(package.to_string()));
        Ok(())
    }

    fn grant_requested_permissions(
        &self,
        package: &str,
        policy: AppPermissionPolicy,
    ) -> PlatformResult<()> {
        self.record(DeviceAction::GrantPermissions(package.to_string(), policy));
        Ok(())
    }
}

// ── Packages & activities ────────────────────────────────────

impl PackageManager for HostDevice {
    fn launch_intent_for(&self, package: &str) -> Option<LaunchIntent> {
        self.is_installed(package)
            .then(|| LaunchIntent::for_package(package))
    }

    fn is_installed(&self, package: &str) -> bool {
        self.lock().installed.contains(package)
    }

    fn input_method_packages(&self) -> Vec<String> {
        self.lock().input_methods.clone()
    }

    fn handlers_for(&self, _intent: &LaunchIntent) -> Vec<String> {
        self.lock().browsable_handlers.clone()
    }
}

impl ActivityLauncher for HostDevice {
    fn start_activity(&self, intent: &LaunchIntent) -> PlatformResult<()> {
        if let Some(package) = intent.package.as_deref()
            && !self.is_installed(package)
        {
            return Err(PlatformError::NotFound(package.to_string()));
        }
        self.record(DeviceAction::StartActivity(intent.clone()));
        Ok(())
    }

    fn send_broadcast(&self, intent: &LaunchIntent) -> PlatformResult<()> {
        self.record(DeviceAction::Broadcast(intent.clone()));
        Ok(())
    }

    fn bring_home_to_front(&self) -> PlatformResult<()> {
        self.record(DeviceAction::BringHomeToFront);
        Ok(())
    }
}

// ── Presentation ─────────────────────────────────────────────

impl Presenter for HostDevice {
    fn show_lock_surface(&self) -> PlatformResult<()> {
        self.lock().lock_surface_shown = true;
        self.record(DeviceAction::ShowLockSurface);
        Ok(())
    }

    fn dismiss_lock_surface(&self) -> PlatformResult<()> {
        self.lock().lock_surface_shown = false;
        self.record(DeviceAction::DismissLockSurface);
        Ok(())
    }

    fn is_lock_surface_shown(&self) -> bool {
        self.lock().lock_surface_shown
    }

    fn show_attention(&self, timeout: Duration) -> PlatformResult<()> {
        self.record(DeviceAction::ShowAttention(timeout));
        Ok(())
    }

    fn show_message(&self, text: &str, timeout: Duration) -> PlatformResult<()> {
        self.record(DeviceAction::ShowMessage(text.to_string(), timeout));
        Ok(())
    }

    fn show_admin_panel(&self) -> PlatformResult<()> {
        self.record(DeviceAction::ShowAdminPanel);
        Ok(())
    }
}

// ── Install manager ──────────────────────────────────────────

#[async_trait]
impl InstallManager for HostDevice {
    async fn uninstall(&self, package: &str) -> PlatformResult<()> {
        if !self.lock().installed.remove(package) {
            return Err(PlatformError::NotFound(package.to_string()));
        }
        self.record(DeviceAction::Uninstall(package.to_string()));
        Ok(())
    }

    fn downloaded_files(&self) -> Vec<PathBuf> {
        self.lock().downloads.clone()
    }

    fn forget_downloads(&self) {
        self.lock().downloads.clear();
        self.record(DeviceAction::ForgetDownloads);
    }
}

// ── Audio ────────────────────────────────────────────────────

struct HostTone {
    state: Arc<Mutex<HostState>>,
}

impl AlertTone for HostTone {
    fn stop(self: Box<Self>) {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .journal
            .push(DeviceAction::AlertToneStopped);
    }
}

impl AudioControl for HostDevice {
    fn stream_volume(&self, stream: AudioStream) -> PlatformResult<u32> {
        Ok(self.stream_volume_of(stream))
    }

    fn max_stream_volume(&self, _stream: AudioStream) -> PlatformResult<u32> {
        Ok(DEFAULT_MAX_STREAM_VOLUME)
    }

    fn set_stream_volume(&self, stream: AudioStream, volume: u32) -> PlatformResult<()> {
        self.lock().stream_volumes.insert(stream, volume);
        self.record(DeviceAction::StreamVolume(stream, volume));
        Ok(())
    }

    fn set_volume_percent(&self, percent: u8) -> PlatformResult<()> {
        let (failing, locked) = {
            let state = self.lock();
            (state.faults.volume_control, state.volume_locked)
        };
        if failing {
            return Err(PlatformError::Unsupported("volume control".into()));
        }
        if locked {
            return Err(PlatformError::rejected("volume", "volume adjustment is locked"));
        }
        self.record(DeviceAction::VolumePercent(percent));
        Ok(())
    }

    fn start_alert_tone(&self) -> PlatformResult<Box<dyn AlertTone>> {
        if self.lock().faults.alert_tone {
            return Err(PlatformError::NotFound("alarm tone".into()));
        }
        self.record(DeviceAction::AlertToneStarted);
        Ok(Box::new(HostTone {
            state: Arc::clone(&self.state),
        }))
    }
}

// ── Sensors ──────────────────────────────────────────────────

impl LocationSource for HostDevice {
    fn last_known(&self, provider: LocationProvider) -> Option<LocationSample> {
        self.lock().last_known.get(&provider).cloned()
    }

    fn request_updates(
        &self,
        _interval: Duration,
        sink: mpsc::UnboundedSender<LocationSample>,
    ) -> PlatformResult<u64> {
        let id = self.next_registration.fetch_add(1, Ordering::SeqCst);
        self.lock().location_sinks.insert(id, sink);
        self.record(DeviceAction::RequestLocationUpdates(id));
        Ok(id)
    }

    fn remove_updates(&self, registration: u64) {
        if self.lock().location_sinks.remove(&registration).is_some() {
            self.record(DeviceAction::RemoveLocationUpdates(registration));
        }
    }
}

impl UsageStats for HostDevice {
    fn query(&self, from_ms: i64, to_ms: i64) -> Option<Vec<UsageSample>> {
        let samples: Vec<_> = self
            .lock()
            .usage
            .iter()
            .filter(|s| s.last_used_ms >= from_ms && s.last_used_ms <= to_ms)
            .cloned()
            .collect();
        (!samples.is_empty()).then_some(samples)
    }
}

// ── Connectivity ─────────────────────────────────────────────

impl HostDevice {
    fn add_network(&self, descriptor: &NetworkDescriptor) -> i32 {
        let mut state = self.lock();
        let ssid = descriptor.ssid.trim_matches('"');
        if state.faults.add_network_for.contains(ssid) {
            return -1;
        }
        state.next_network_id += 1;
        state.next_network_id
    }
}

impl WifiManager for HostDevice {
    fn is_enabled(&self) -> bool {
        self.lock().wifi_enabled
    }

    fn set_enabled(&self, enabled: bool) -> PlatformResult<()> {
        self.lock().wifi_enabled = enabled;
        self.record(DeviceAction::WifiEnabled(enabled));
        Ok(())
    }

    fn add_network_privileged(&self, descriptor: &NetworkDescriptor) -> PlatformResult<i32> {
        self.record(DeviceAction::AddNetworkPrivileged(descriptor.clone()));
        Ok(self.add_network(descriptor))
    }

    fn add_network_legacy(&self, descriptor: &NetworkDescriptor) -> PlatformResult<i32> {
        self.record(DeviceAction::AddNetworkLegacy(descriptor.clone()));
        Ok(self.add_network(descriptor))
    }

    fn enable_network(&self, network_id: i32) -> PlatformResult<bool> {
        self.record(DeviceAction::EnableNetwork(network_id));
        Ok(true)
    }

    fn save_configuration(&self) -> PlatformResult<()> {
        self.record(DeviceAction::SaveWifiConfiguration);
        Ok(())
    }

    fn network_suggestions(&self) -> PlatformResult<Vec<Suggestion>> {
        Ok(self.lock().suggestions.clone())
    }

    fn remove_suggestions(&self, suggestions: &[Suggestion]) -> PlatformResult<()> {
        self.lock().suggestions.retain(|s| !suggestions.contains(s));
        self.record(DeviceAction::RemoveSuggestions(suggestions.len()));
        Ok(())
    }

    fn add_suggestions(&self, suggestions: &[Suggestion]) -> PlatformResult<i32> {
        self.record(DeviceAction::AddSuggestions(suggestions.to_vec()));
        let mut state = self.lock();
        let status = state.faults.suggestion_status;
        if status == 0 {
            state.suggestions.extend_from_slice(suggestions);
        }
        Ok(status)
    }
}

// ── Shell (simulated) ────────────────────────────────────────

#[async_trait]
impl ShellRunner for HostDevice {
    async fn run(&self, command: &str) -> PlatformResult<String> {
        self.record(DeviceAction::Shell(command.to_string()));
        Ok(String::new())
    }
}

impl CapabilityProbe for HostDevice {
    fn is_device_owner(&self) -> bool {
        self.device_owner.load(Ordering::SeqCst)
    }

    fn sdk_level(&self) -> u32 {
        u32::try_from(self.sdk_level.load(Ordering::SeqCst)).unwrap_or(u32::MAX)
    }
}
