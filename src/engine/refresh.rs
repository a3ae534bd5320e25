use crate::audit::AuditLog;
use crate::containment::PermissiveMode;
use crate::device::{DeviceConfig, DeviceConfigSource};
use crate::events::{AgentEvent, EventBus};
use crate::wifi::{NetworkProvisioner, ProvisioningReport};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Applies a freshly received device configuration.
pub struct ConfigRefresher {
    source: Arc<DeviceConfigSource>,
    permissive: Arc<PermissiveMode>,
    provisioner: Arc<NetworkProvisioner>,
    audit: AuditLog,
}

impl ConfigRefresher {
    pub fn new(
        source: Arc<DeviceConfigSource>,
        permissive: Arc<PermissiveMode>,
        provisioner: Arc<NetworkProvisioner>,
        audit: AuditLog,
    ) -> Self {
        Self {
            source,
            permissive,
            provisioner,
            audit,
        }
    }

    /// Reload from the cache and apply. Returns the provisioning report when
    /// a configuration is available.
    pub fn refresh(&self) -> Option<ProvisioningReport> {
        match self.source.reload() {
            Ok(Some(config)) => Some(self.apply(&config)),
            Ok(None) => {
                tracing::debug!("no device configuration yet");
                None
            }
            Err(e) => {
                self.audit.warn(format!("Failed to load device configuration: {e}"));
                None
            }
        }
    }

    pub fn apply(&self, config: &DeviceConfig) -> ProvisioningReport {
        self.permissive.set_indefinite(config.is_permissive());
        self.provisioner.apply(config.wifi_networks())
    }

    pub fn spawn(self: Arc<Self>, events: &EventBus, cancel: CancellationToken) -> JoinHandle<()> {
        let mut rx = events.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    event = rx.recv() => match event {
                        Ok(AgentEvent::ConfigUpdated) => {
                            self.refresh();
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "config refresher lagged, refreshing");
                            self.refresh();
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        })
    }
}
