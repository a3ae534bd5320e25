use crate::audit::AuditLog;
use crate::config::ConfigHandle;
use crate::device::{ActivityLauncher, Capabilities, ConfigProvider, DevicePolicy, Presenter};
use crate::events::{AgentEvent, EventBus};
use crate::lock::LockStateMachine;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Reacts to kiosk events from the bus: enter and exit the restrictive
/// running mode, open the admin surface.
pub struct KioskSession {
    settings: ConfigHandle,
    config: Arc<dyn ConfigProvider>,
    policy: Arc<dyn DevicePolicy>,
    launcher: Arc<dyn ActivityLauncher>,
    presenter: Arc<dyn Presenter>,
    lock: Arc<LockStateMachine>,
    caps: Capabilities,
    audit: AuditLog,
}

impl KioskSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: ConfigHandle,
        config: Arc<dyn ConfigProvider>,
        policy: Arc<dyn DevicePolicy>,
        launcher: Arc<dyn ActivityLauncher>,
        presenter: Arc<dyn Presenter>,
        lock: Arc<LockStateMachine>,
        caps: Capabilities,
        audit: AuditLog,
    ) -> Self {
        Self {
            settings,
            config,
            policy,
            launcher,
            presenter,
            lock,
            caps,
            audit,
        }
    }

    /// Agent, configured applications and the kiosk app.
    pub fn lock_task_packages(&self) -> Vec<String> {
        let mut packages = vec![self.settings.load().agent.package.clone()];
        if let Some(config) = self.config.current() {
            for package in config
                .applications()
                .iter()
                .filter(|app| !app.is_removed())
                .filter_map(|app| app.package())
                .chain(config.main_app.as_deref().filter(|m| !m.is_empty()))
            {
                if !packages.iter().any(|p| p == package) {
                    packages.push(package.to_string());
                }
            }
        }
        packages
    }

    pub fn enter(&self) {
        let agent = self.settings.load().agent.package.clone();
        if self.caps.is_elevated()
            && let Err(e) = self.policy.set_lock_task_packages(&self.lock_task_packages())
        {
            tracing::warn!("failed to set kiosk lock task packages: {e}");
        }
        if let Err(e) = self.launcher.bring_home_to_front() {
            tracing::warn!("failed to raise kiosk surface: {e}");
        }
        if !self.policy.is_lock_task_permitted(&agent) {
            self.audit.warn("Kiosk mode: lock task not permitted for the agent");
            return;
        }
        if !self.policy.is_lock_task_active() {
            match self.policy.start_lock_task() {
                Ok(()) => self.audit.info("Kiosk mode entered"),
                Err(e) => self.audit.warn(format!("Failed to enter kiosk mode: {e}")),
            }
        }
    }

    /// Leave the restrictive mode. A locked device keeps it.
    pub fn exit(&self) {
        let exited = self.lock.while_unlocked(|| {
            if self.policy.is_lock_task_active() {
                match self.policy.stop_lock_task() {
                    Ok(()) => self.audit.info("Kiosk mode exited"),
                    Err(e) => self.audit.warn(format!("Failed to exit kiosk mode: {e}")),
                }
            }
        });
        if exited.is_none() {
            tracing::debug!("exit-kiosk ignored while locked");
        }
    }

    pub fn open_admin_panel(&self) {
        if let Err(e) = self.presenter.show_admin_panel() {
            self.audit.warn(format!("Failed to open admin panel: {e}"));
        }
    }

    pub fn handle(&self, event: &AgentEvent) {
        match event {
            AgentEvent::EnterKiosk => self.enter(),
            AgentEvent::ExitKiosk => self.exit(),
            AgentEvent::AdminPanel => self.open_admin_panel(),
            _ => {}
        }
    }

    pub fn spawn(self: Arc<Self>, events: &EventBus, cancel: CancellationToken) -> JoinHandle<()> {
        let mut rx = events.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(event) => self.handle(&event),
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "kiosk session lagged behind the event bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        })
    }
}
