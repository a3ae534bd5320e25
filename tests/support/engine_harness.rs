#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use kioskd::audit::AuditLog;
use kioskd::command::Command;
use kioskd::config::{Config, ConfigHandle, StorageConfig};
use kioskd::device::{Platform, ShellRunner, TelemetryUplink};
use kioskd::emergency::LocationSample;
use kioskd::engine::DeviceEngine;
use kioskd::platform::{DeviceAction, HostDevice};

/// Uplink that keeps every batch it was handed.
#[derive(Default)]
pub struct RecordingUplink {
    batches: Mutex<Vec<(String, String, Vec<LocationSample>)>>,
}

impl RecordingUplink {
    pub fn samples(&self) -> Vec<LocationSample> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, _, samples)| samples.clone())
            .collect()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl TelemetryUplink for RecordingUplink {
    async fn send_locations(
        &self,
        project: &str,
        device_id: &str,
        samples: &[LocationSample],
    ) -> anyhow::Result<()> {
        self.batches.lock().unwrap().push((
            project.to_string(),
            device_id.to_string(),
            samples.to_vec(),
        ));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Agent settings with every storage path under `root`.
pub fn config_in(root: &Path) -> Config {
    let dir = root.display();
    Config {
        config_path: root.join("config.toml"),
        storage: StorageConfig {
            boot_dir: format!("{dir}/boot"),
            state_dir: format!("{dir}/state"),
            external_root: format!("{dir}/storage"),
            device_config_path: format!("{dir}/state/device_config.json"),
        },
        ..Config::default()
    }
}

pub fn write_device_config(config: &Config, device_config: &Value) {
    let path = config.storage.device_config_path();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(device_config).unwrap()).unwrap();
}

/// A running engine on a [`HostDevice`] with temporary storage.
pub struct EngineHarness {
    pub tmp: TempDir,
    pub config: Config,
    pub device: Arc<HostDevice>,
    pub uplink: Arc<RecordingUplink>,
    pub audit: AuditLog,
    pub engine: DeviceEngine,
}

impl EngineHarness {
    pub fn start(device: HostDevice, device_config: Option<Value>) -> Self {
        let tmp = TempDir::new().unwrap();
        let config = config_in(tmp.path());
        Self::start_with(tmp, config, device, device_config)
    }

    pub fn start_with(
        tmp: TempDir,
        config: Config,
        device: HostDevice,
        device_config: Option<Value>,
    ) -> Self {
        Self::start_customized(tmp, config, device, device_config, |_, _| {})
    }

    /// Like [`start_with`](Self::start_with), letting `customize` replace
    /// collaborators before the engine boots.
    pub fn start_customized(
        tmp: TempDir,
        config: Config,
        device: HostDevice,
        device_config: Option<Value>,
        customize: impl FnOnce(&Config, &mut Platform),
    ) -> Self {
        if let Some(device_config) = device_config {
            write_device_config(&config, &device_config);
        }
        let device = Arc::new(device);
        let uplink = Arc::new(RecordingUplink::default());
        let audit = AuditLog::buffered(1_024);
        let shell: Arc<dyn ShellRunner> = device.clone();
        let mut platform = device.platform(shell, uplink.clone());
        customize(&config, &mut platform);
        let engine = DeviceEngine::start(ConfigHandle::new(config.clone()), platform, audit.clone());
        Self {
            tmp,
            config,
            device,
            uplink,
            audit,
            engine,
        }
    }

    /// Stop this engine and boot a new one on the same storage with a
    /// fresh device.
    pub fn restart(self, device: HostDevice) -> Self {
        let Self {
            tmp, config, engine, ..
        } = self;
        engine.stop();
        drop(engine);
        Self::start_with(tmp, config, device, None)
    }

    /// Dispatch one command and wait for it to finish, background ones
    /// included.
    pub async fn send(&self, message_type: &str, payload: Option<Value>) {
        if let Some(handle) = self.dispatch(message_type, payload).await {
            handle.await.unwrap();
        }
    }

    /// Dispatch one command without waiting for its background worker.
    pub async fn dispatch(
        &self,
        message_type: &str,
        payload: Option<Value>,
    ) -> Option<JoinHandle<()>> {
        self.engine
            .router()
            .dispatch(Command::new(message_type, payload))
            .await
    }

    pub fn audit_messages(&self) -> Vec<String> {
        self.audit
            .buffer()
            .map(|b| b.entries().into_iter().map(|e| e.message).collect())
            .unwrap_or_default()
    }

    pub fn audited(&self, needle: &str) -> bool {
        self.audit_messages().iter().any(|m| m.contains(needle))
    }

    pub fn journal_count(&self, pred: impl Fn(&DeviceAction) -> bool) -> usize {
        self.device.count(pred)
    }

    /// Poll `cond` until it holds or two seconds pass.
    pub async fn eventually(&self, cond: impl Fn(&Self) -> bool) -> bool {
        for _ in 0..200 {
            if cond(self) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        cond(self)
    }
}
