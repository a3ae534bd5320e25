//! Composition root: builds every component against a [`Platform`] and
//! drives the start and stop sequence.

mod refresh;

pub use refresh::ConfigRefresher;

use crate::audit::AuditLog;
use crate::command::{CommandContext, CommandRouter};
use crate::config::{ConfigHandle, EnforcementBackend};
use crate::containment::{ContainmentPolicy, ContainmentService, Grant, KioskSession, PermissiveMode};
use crate::device::{
    Capabilities, ConfigProvider, DeviceConfigSource, Platform, PlatformTier, PrivilegeTier,
};
use crate::emergency::{EmergencyController, LocationReporter};
use crate::events::EventBus;
use crate::lock::{LockStateMachine, LockStateStore, early_lock_check};
use crate::wifi::NetworkProvisioner;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Point-in-time view written by the daemon's status writer.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub locked: bool,
    pub locked_at_boot: bool,
    pub emergency_active: bool,
    pub emergency_ping_interval_ms: Option<u128>,
    pub permissive: String,
    pub containment_backend: EnforcementBackend,
    pub containment_running: bool,
    pub privilege: PrivilegeTier,
    pub platform: PlatformTier,
    pub sdk_level: u32,
    pub audit_backend: String,
}

pub struct DeviceEngine {
    settings: ConfigHandle,
    platform: Platform,
    caps: Capabilities,
    events: EventBus,
    audit: AuditLog,
    device_config: Arc<DeviceConfigSource>,
    permissive: Arc<PermissiveMode>,
    lock: Arc<LockStateMachine>,
    emergency: Arc<EmergencyController>,
    reporter: Arc<LocationReporter>,
    containment: ContainmentService,
    provisioner: Arc<NetworkProvisioner>,
    router: CommandRouter,
    locked_at_boot: bool,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DeviceEngine {
    /// Run the start sequence. Must be called inside a tokio runtime.
    ///
    /// The persisted lock state is checked before anything else is built,
    /// so a locked device shows its lock surface without waiting on
    /// configuration.
    pub fn start(settings: ConfigHandle, platform: Platform, audit: AuditLog) -> Self {
        let snapshot = settings.load_full();

        let store = LockStateStore::open(&snapshot.storage.boot_dir());
        let locked_at_boot = early_lock_check(&store, platform.presenter.as_ref());

        let device_config = Arc::new(DeviceConfigSource::new(
            snapshot.storage.device_config_path(),
        ));
        if let Err(e) = device_config.reload() {
            audit.warn(format!("Failed to load device configuration: {e}"));
        }
        let config: Arc<dyn ConfigProvider> = device_config.clone();

        let caps = Capabilities::detect(platform.probe.as_ref());
        tracing::info!(
            privilege = %caps.privilege,
            platform = %caps.platform,
            sdk = caps.sdk_level,
            "capabilities detected"
        );

        let events = EventBus::default();
        let permissive = Arc::new(PermissiveMode::new());
        let lock = Arc::new(LockStateMachine::new(
            store,
            platform.policy.clone(),
            platform.presenter.clone(),
            config.clone(),
            caps,
            snapshot.agent.package.clone(),
            events.clone(),
            audit.clone(),
        ));
        let emergency = Arc::new(EmergencyController::new(
            platform.audio.clone(),
            platform.location.clone(),
            platform.uplink.clone(),
            settings.clone(),
            audit.clone(),
        ));
        let reporter = Arc::new(LocationReporter::new(settings.clone(), audit.clone()));

        let policy = Arc::new(ContainmentPolicy::new(
            settings.clone(),
            config.clone(),
            platform.packages.clone(),
            platform.launcher.clone(),
            permissive.clone(),
            audit.clone(),
        ));
        let containment = ContainmentService::new(
            policy,
            platform.usage.clone(),
            snapshot.containment.clone(),
        );
        let kiosk = Arc::new(KioskSession::new(
            settings.clone(),
            config.clone(),
            platform.policy.clone(),
            platform.launcher.clone(),
            platform.presenter.clone(),
            lock.clone(),
            caps,
            audit.clone(),
        ));
        let provisioner = Arc::new(NetworkProvisioner::new(
            platform.wifi.clone(),
            caps,
            audit.clone(),
        ));
        let refresher = Arc::new(ConfigRefresher::new(
            device_config.clone(),
            permissive.clone(),
            provisioner.clone(),
            audit.clone(),
        ));

        let router = CommandRouter::new(CommandContext {
            settings: settings.clone(),
            config: config.clone(),
            platform: platform.clone(),
            caps,
            lock: lock.clone(),
            emergency: emergency.clone(),
            permissive: permissive.clone(),
            events: events.clone(),
            audit: audit.clone(),
        });

        let cancel = CancellationToken::new();
        let tasks = vec![
            kiosk.spawn(&events, cancel.child_token()),
            refresher.clone().spawn(&events, cancel.child_token()),
            reporter.spawn_tracking(platform.location.clone(), cancel.child_token()),
        ];

        if let Some(current) = device_config.current() {
            refresher.apply(&current);
        }
        containment.start();

        let locked = lock.recheck_persisted();
        if !locked
            && device_config.current().is_some_and(|c| c.is_kiosk_mode())
            && let Err(e) = platform.launcher.bring_home_to_front()
        {
            tracing::warn!("failed to raise kiosk surface: {e}");
        }

        audit.info("Agent started");
        Self {
            settings,
            platform,
            caps,
            events,
            audit,
            device_config,
            permissive,
            lock,
            emergency,
            reporter,
            containment,
            provisioner,
            router,
            locked_at_boot,
            cancel,
            tasks: Mutex::new(tasks),
        }
    }

    /// Cancel timers, release emergency resources and drop subscriptions.
    /// Safe to call more than once.
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.containment.stop();
        self.emergency.stop();
        for task in self
            .tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
        self.audit.info("Agent stopped");
        self.audit.flush();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    pub fn settings(&self) -> &ConfigHandle {
        &self.settings
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn device_config(&self) -> &Arc<DeviceConfigSource> {
        &self.device_config
    }

    pub fn permissive(&self) -> &Arc<PermissiveMode> {
        &self.permissive
    }

    pub fn lock(&self) -> &Arc<LockStateMachine> {
        &self.lock
    }

    pub fn emergency(&self) -> &Arc<EmergencyController> {
        &self.emergency
    }

    pub fn reporter(&self) -> &Arc<LocationReporter> {
        &self.reporter
    }

    pub fn containment(&self) -> &ContainmentService {
        &self.containment
    }

    pub fn provisioner(&self) -> &Arc<NetworkProvisioner> {
        &self.provisioner
    }

    pub fn locked_at_boot(&self) -> bool {
        self.locked_at_boot
    }

    pub fn status(&self) -> EngineStatus {
        let permissive = match self.permissive.grant() {
            Grant::Off => "off".to_string(),
            Grant::Until(end) => format!("until {end}"),
            Grant::Indefinite => "indefinite".to_string(),
        };
        EngineStatus {
            locked: self.lock.is_locked(),
            locked_at_boot: self.locked_at_boot,
            emergency_active: self.emergency.is_active(),
            emergency_ping_interval_ms: self.emergency.ping_interval().map(|d| d.as_millis()),
            permissive,
            containment_backend: self.containment.backend(),
            containment_running: self.containment.is_running(),
            privilege: self.caps.privilege,
            platform: self.caps.platform,
            sdk_level: self.caps.sdk_level,
            audit_backend: self.audit.backend_name().to_string(),
        }
    }
}

impl Drop for DeviceEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
