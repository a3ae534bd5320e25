//! Foreground containment: keep the device inside the allowed app set.

pub mod allowed;
pub mod event_backend;
pub mod kiosk;
pub mod permissive;
pub mod policy;
pub mod polling_backend;

pub use allowed::AllowedAppSet;
pub use event_backend::EventEnforcer;
pub use kiosk::KioskSession;
pub use permissive::{Grant, PermissiveMode};
pub use policy::{ContainmentPolicy, Verdict};
pub use polling_backend::PollingEnforcer;

use crate::config::{ContainmentConfig, EnforcementBackend};
use crate::device::UsageStats;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    foreground: Option<mpsc::UnboundedSender<String>>,
}

/// Runs the configured enforcement backend until stopped.
pub struct ContainmentService {
    policy: Arc<ContainmentPolicy>,
    usage: Arc<dyn UsageStats>,
    config: ContainmentConfig,
    running: Mutex<Option<Running>>,
}

impl ContainmentService {
    pub fn new(
        policy: Arc<ContainmentPolicy>,
        usage: Arc<dyn UsageStats>,
        config: ContainmentConfig,
    ) -> Self {
        Self {
            policy,
            usage,
            config,
            running: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &Arc<ContainmentPolicy> {
        &self.policy
    }

    pub fn backend(&self) -> EnforcementBackend {
        self.config.backend
    }

    pub fn is_running(&self) -> bool {
        self.lock_running().is_some()
    }

    /// Start the backend. A second call is a no-op.
    pub fn start(&self) {
        let mut running = self.lock_running();
        if running.is_some() {
            return;
        }
        let cancel = CancellationToken::new();
        let (task, foreground) = match self.config.backend {
            EnforcementBackend::Polling => {
                let enforcer = Arc::new(PollingEnforcer::new(
                    self.policy.clone(),
                    self.usage.clone(),
                    Duration::from_millis(self.config.poll_interval_ms),
                    Duration::from_millis(self.config.usage_window_ms),
                ));
                (enforcer.spawn(cancel.clone()), None)
            }
            EnforcementBackend::Event => {
                let enforcer = EventEnforcer::new(
                    self.policy.clone(),
                    Duration::from_millis(self.config.block_cooldown_ms),
                );
                let (tx, rx) = mpsc::unbounded_channel();
                (spawn_event_feed(enforcer, rx, cancel.clone()), Some(tx))
            }
        };
        tracing::info!(backend = ?self.config.backend, "containment started");
        *running = Some(Running {
            cancel,
            task,
            foreground,
        });
    }

    /// Feed for foreground-change notifications. `None` unless the event
    /// backend is running.
    pub fn foreground_sender(&self) -> Option<mpsc::UnboundedSender<String>> {
        self.lock_running()
            .as_ref()
            .and_then(|r| r.foreground.clone())
    }

    /// Cancel timers and drop subscriptions.
    pub fn stop(&self) {
        if let Some(running) = self.lock_running().take() {
            running.cancel.cancel();
            running.task.abort();
            tracing::info!("containment stopped");
        }
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for ContainmentService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn spawn_event_feed(
    enforcer: EventEnforcer,
    mut rx: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                package = rx.recv() => match package {
                    Some(package) => {
                        enforcer.on_foreground_changed(&package, chrono::Utc::now().timestamp_millis());
                    }
                    None => break,
                },
            }
        }
    })
}
