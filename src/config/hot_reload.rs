use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::Config;

/// Shared agent settings. Readers take lock-free snapshots; `reload` swaps
/// in a freshly parsed file (SIGHUP in the daemon).
///
/// Components built at start (storage paths, the containment backend) keep
/// what they were built with; everything read per operation sees the new
/// values immediately.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<ArcSwap<Config>>,
    path: PathBuf,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        let path = config.config_path.clone();
        Self {
            inner: Arc::new(ArcSwap::from_pointee(config)),
            path,
        }
    }

    pub fn load(&self) -> arc_swap::Guard<Arc<Config>> {
        self.inner.load()
    }

    pub fn load_full(&self) -> Arc<Config> {
        self.inner.load_full()
    }

    /// Re-read the TOML file and swap it in. The old snapshot stays active
    /// when the file does not parse or validate.
    pub fn reload(&self) -> anyhow::Result<()> {
        let fresh = Arc::new(Config::load_from(&self.path)?);
        let previous = self.inner.swap(Arc::clone(&fresh));
        for section in restart_only_changes(&previous, &fresh) {
            tracing::warn!(section, "changed setting applies after restart");
        }
        tracing::info!(path = %self.path.display(), "agent config reloaded");
        Ok(())
    }

    pub fn store(&self, config: Config) {
        self.inner.store(Arc::new(config));
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn restart_only_changes(previous: &Config, fresh: &Config) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if previous.storage.boot_dir != fresh.storage.boot_dir
        || previous.storage.device_config_path != fresh.storage.device_config_path
    {
        changed.push("storage");
    }
    if previous.containment.backend != fresh.containment.backend
        || previous.containment.poll_interval_ms != fresh.containment.poll_interval_ms
    {
        changed.push("containment");
    }
    if previous.host.device_owner != fresh.host.device_owner
        || previous.host.sdk_level != fresh.host.sdk_level
    {
        changed.push("host");
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_handle_store_swaps_atomically() {
        let handle = ConfigHandle::new(Config::default());

        let mut updated = Config::default();
        updated.containment.poll_interval_ms = 750;
        handle.store(updated);

        assert_eq!(handle.load().containment.poll_interval_ms, 750);
    }

    #[test]
    fn config_handle_clone_shares_state() {
        let handle = ConfigHandle::new(Config::default());
        let clone = handle.clone();

        let mut updated = Config::default();
        updated.agent.project = "district-3".into();
        handle.store(updated);

        assert_eq!(clone.load().agent.project, "district-3");
    }

    #[test]
    fn reload_picks_up_file_changes() {
        let tmp = TempDir::new().unwrap();
        let config = Config {
            config_path: tmp.path().join("config.toml"),
            ..Config::default()
        };
        config.save().unwrap();
        let handle = ConfigHandle::new(config);

        std::fs::write(handle.path(), "[emergency]\ndefault_ping_interval_ms = 5000\n").unwrap();
        handle.reload().unwrap();

        assert_eq!(handle.load().emergency.default_ping_interval_ms, 5_000);
    }

    #[test]
    fn backend_switch_is_flagged_for_restart() {
        let previous = Config::default();
        let mut fresh = Config::default();
        assert!(restart_only_changes(&previous, &fresh).is_empty());

        fresh.containment.backend = crate::config::EnforcementBackend::Event;
        fresh.presentation.message_timeout_ms = 1;
        assert_eq!(restart_only_changes(&previous, &fresh), vec!["containment"]);
    }

    #[test]
    fn reload_fails_on_missing_file() {
        let config = Config {
            config_path: PathBuf::from("/nonexistent/path/config.toml"),
            ..Config::default()
        };
        let handle = ConfigHandle::new(config);
        assert!(handle.reload().is_err());
    }
}
