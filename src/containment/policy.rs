use super::allowed::AllowedAppSet;
use super::permissive::PermissiveMode;
use crate::audit::AuditLog;
use crate::config::ConfigHandle;
use crate::device::{ActivityLauncher, ConfigProvider, PackageManager};
use std::sync::Arc;

/// Result of one containment check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Permissive mode is on, or nothing has been configured yet.
    Skipped,
    Allowed,
    /// Foreground package was not allowed; the managed surface was raised.
    Blocked,
    /// Same package was blocked a moment ago; nothing done.
    Debounced,
}

/// Check shared by both enforcement backends.
pub struct ContainmentPolicy {
    settings: ConfigHandle,
    config: Arc<dyn ConfigProvider>,
    packages: Arc<dyn PackageManager>,
    launcher: Arc<dyn ActivityLauncher>,
    permissive: Arc<PermissiveMode>,
    audit: AuditLog,
}

impl ContainmentPolicy {
    pub fn new(
        settings: ConfigHandle,
        config: Arc<dyn ConfigProvider>,
        packages: Arc<dyn PackageManager>,
        launcher: Arc<dyn ActivityLauncher>,
        permissive: Arc<PermissiveMode>,
        audit: AuditLog,
    ) -> Self {
        Self {
            settings,
            config,
            packages,
            launcher,
            permissive,
            audit,
        }
    }

    pub fn permissive(&self) -> &Arc<PermissiveMode> {
        &self.permissive
    }

    pub fn allowed_set(&self) -> AllowedAppSet {
        let settings = self.settings.load();
        let config = self.config.current();
        let input_methods = if settings.containment.include_input_methods() {
            self.packages.input_method_packages()
        } else {
            Vec::new()
        };
        AllowedAppSet::build(
            &settings.agent.package,
            &settings.agent.system_ui_package,
            config.as_deref(),
            &input_methods,
        )
    }

    /// Check `foreground` at `now_ms`. The timed permissive grant is
    /// expired before anything else is looked at.
    pub fn evaluate(&self, foreground: &str, now_ms: i64) -> Verdict {
        if self.permissive.is_active(now_ms) {
            return Verdict::Skipped;
        }
        let Some(config) = self.config.current() else {
            return Verdict::Skipped;
        };
        if config.is_permissive() {
            return Verdict::Skipped;
        }

        if self.allowed_set().contains(foreground) {
            return Verdict::Allowed;
        }

        tracing::info!(package = %foreground, "blocking foreground app");
        if let Err(e) = self.launcher.bring_home_to_front() {
            tracing::warn!("failed to raise managed surface: {e}");
        }
        self.audit.info(format!("Blocked app: {foreground}"));
        Verdict::Blocked
    }
}
