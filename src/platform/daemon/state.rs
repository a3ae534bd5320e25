use crate::audit::AuditLog;
use crate::config::Config;
use crate::engine::{DeviceEngine, EngineStatus};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;
use tokio::time::Duration;

pub const STATE_FILE: &str = "agent_state.json";
/// JSON lines of buffered audit entries awaiting pickup.
pub const AUDIT_OUTBOX_FILE: &str = "audit_outbox.jsonl";

#[derive(Debug, Clone, serde::Serialize)]
pub(super) struct AgentSnapshot {
    #[serde(flatten)]
    status: EngineStatus,
    written_at: String,
}

pub fn state_file_path(config: &Config) -> PathBuf {
    config.storage.state_dir().join(STATE_FILE)
}

pub fn audit_outbox_path(config: &Config) -> PathBuf {
    config.storage.state_dir().join(AUDIT_OUTBOX_FILE)
}

/// Move everything queued by a buffering audit backend to the outbox file.
/// Returns how many entries were appended.
pub(super) async fn flush_audit_outbox(path: &Path, audit: &AuditLog) -> usize {
    let Some(buffer) = audit.buffer() else {
        return 0;
    };
    let entries = buffer.drain();
    if entries.is_empty() {
        return 0;
    }

    let mut body = Vec::new();
    for entry in &entries {
        match serde_json::to_writer(&mut body, entry) {
            Ok(()) => body.push(b'\n'),
            Err(error) => tracing::warn!(%error, "failed to encode audit entry"),
        }
    }

    let appended = async {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(&body).await?;
        file.flush().await
    }
    .await;
    match appended {
        Ok(()) => entries.len(),
        Err(error) => {
            tracing::warn!(%error, lost = entries.len(), "failed to append audit outbox");
            0
        }
    }
}

pub(super) async fn write_snapshot(path: &Path, engine: &DeviceEngine) {
    let snapshot = AgentSnapshot {
        status: engine.status(),
        written_at: Utc::now().to_rfc3339(),
    };
    let data = serde_json::to_vec_pretty(&snapshot).unwrap_or_else(|_| b"{}".to_vec());
    if let Err(error) = tokio::fs::write(path, data).await {
        tracing::warn!(%error, "failed to write agent state file");
    }
}

pub(super) fn spawn_state_writer(config: Arc<Config>, engine: Arc<DeviceEngine>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let path = state_file_path(&config);
        let outbox = audit_outbox_path(&config);
        if let Some(parent) = path.parent()
            && let Err(error) = tokio::fs::create_dir_all(parent).await
        {
            tracing::warn!(%error, "failed to create state file directory");
        }

        let mut interval = tokio::time::interval(Duration::from_secs(super::STATUS_FLUSH_SECONDS));
        loop {
            interval.tick().await;
            write_snapshot(&path, &engine).await;
            flush_audit_outbox(&outbox, engine.audit()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::config::StorageConfig;
    use crate::platform::host::HostDevice;
    use crate::uplink::LogUplink;
    use tempfile::TempDir;

    fn test_config(tmp: &TempDir) -> Config {
        let root = tmp.path().display();
        Config {
            config_path: tmp.path().join("config.toml"),
            storage: StorageConfig {
                boot_dir: format!("{root}/boot"),
                state_dir: format!("{root}/state"),
                external_root: format!("{root}/storage"),
                device_config_path: format!("{root}/state/device_config.json"),
            },
            ..Config::default()
        }
    }

    #[test]
    fn state_file_lives_in_state_dir() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        assert_eq!(state_file_path(&config), tmp.path().join("state").join(STATE_FILE));
    }

    #[tokio::test]
    async fn snapshot_is_written_as_json() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        std::fs::create_dir_all(tmp.path().join("state")).unwrap();

        let device = Arc::new(HostDevice::default());
        let platform = device.platform(device.clone(), Arc::new(LogUplink));
        let engine = DeviceEngine::start(
            crate::config::ConfigHandle::new(config.clone()),
            platform,
            AuditLog::disabled(),
        );

        let path = state_file_path(&config);
        write_snapshot(&path, &engine).await;
        engine.stop();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(json["locked"], false);
        assert_eq!(json["privilege"], "elevated");
        assert!(json["written_at"].is_string());
    }

    #[tokio::test]
    async fn buffered_audit_entries_move_to_outbox() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let path = audit_outbox_path(&config);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        let audit = crate::audit::create_audit_log(&crate::config::ObservabilityConfig {
            audit_backend: "buffer".into(),
            ..crate::config::ObservabilityConfig::default()
        });
        audit.warn("Failed to reboot");
        audit.info("Agent started");

        assert_eq!(flush_audit_outbox(&path, &audit).await, 2);
        assert!(audit.buffer().unwrap().is_empty());
        assert_eq!(flush_audit_outbox(&path, &audit).await, 0);

        audit.error("Command reboot crashed");
        assert_eq!(flush_audit_outbox(&path, &audit).await, 1);

        let lines: Vec<serde_json::Value> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["severity"], "WARN");
        assert_eq!(lines[0]["message"], "Failed to reboot");
        assert_eq!(lines[2]["severity"], "ERROR");
    }

    #[tokio::test]
    async fn unbuffered_audit_has_no_outbox() {
        let tmp = TempDir::new().unwrap();
        let config = test_config(&tmp);
        let path = audit_outbox_path(&config);

        let audit = AuditLog::disabled();
        audit.warn("ignored");

        assert_eq!(flush_audit_outbox(&path, &audit).await, 0);
        assert!(!path.exists());
    }
}
