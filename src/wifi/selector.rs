use super::descriptor::{NetworkDescriptor, SkipReason};
use super::spec::WifiNetworkSpec;
use super::suggestion::{Suggestion, SuggestionStatus};
use crate::audit::{AuditLog, Severity};
use crate::device::{Capabilities, PlatformTier, PrivilegeTier, WifiManager};
use std::sync::Arc;
use strum::Display;

/// Provisioning mechanism, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ProvisioningStrategy {
    /// Elevated + modern: saved-network store via raw descriptors.
    #[strum(serialize = "privileged direct add")]
    PrivilegedDirect,
    /// Elevated on a legacy platform.
    #[strum(serialize = "legacy direct add")]
    PrivilegedLegacy,
    /// Standard + modern: network suggestions.
    #[strum(serialize = "network suggestions")]
    Suggestions,
    /// Standard on a legacy platform. May fail.
    #[strum(serialize = "best-effort legacy add")]
    LegacyBestEffort,
}

impl ProvisioningStrategy {
    pub fn select(privilege: PrivilegeTier, platform: PlatformTier) -> Self {
        match (privilege, platform) {
            (PrivilegeTier::Elevated, PlatformTier::Modern) => Self::PrivilegedDirect,
            (PrivilegeTier::Elevated, PlatformTier::Legacy) => Self::PrivilegedLegacy,
            (PrivilegeTier::Standard, PlatformTier::Modern) => Self::Suggestions,
            (PrivilegeTier::Standard, PlatformTier::Legacy) => Self::LegacyBestEffort,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added,
    Failed(String),
    /// Not attempted.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningResult {
    pub ssid: String,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningReport {
    pub strategy: ProvisioningStrategy,
    pub results: Vec<ProvisioningResult>,
    /// Decoded suggestion status, suggestion tier only.
    pub suggestion_status: Option<SuggestionStatus>,
}

impl ProvisioningReport {
    fn new(strategy: ProvisioningStrategy) -> Self {
        Self {
            strategy,
            results: Vec::new(),
            suggestion_status: None,
        }
    }

    fn push(&mut self, ssid: &str, outcome: Outcome) {
        self.results.push(ProvisioningResult {
            ssid: ssid.to_string(),
            outcome,
        });
    }

    pub fn added(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Added))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Skipped(_)))
    }

    pub fn outcome_of(&self, ssid: &str) -> Option<&Outcome> {
        self.results
            .iter()
            .find(|r| r.ssid == ssid)
            .map(|r| &r.outcome)
    }

    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Applies configured networks using the best mechanism for the detected
/// capability tiers.
pub struct NetworkProvisioner {
    wifi: Arc<dyn WifiManager>,
    caps: Capabilities,
    audit: AuditLog,
}

impl NetworkProvisioner {
    pub fn new(wifi: Arc<dyn WifiManager>, caps: Capabilities, audit: AuditLog) -> Self {
        Self { wifi, caps, audit }
    }

    pub fn strategy(&self) -> ProvisioningStrategy {
        ProvisioningStrategy::select(self.caps.privilege, self.caps.platform)
    }

    pub fn apply(&self, networks: &[WifiNetworkSpec]) -> ProvisioningReport {
        let strategy = self.strategy();
        let mut report = ProvisioningReport::new(strategy);
        if networks.is_empty() {
            tracing::debug!("no Wi-Fi networks to configure");
            return report;
        }

        self.ensure_enabled();

        let count = networks.len();
        match strategy {
            ProvisioningStrategy::LegacyBestEffort => self.audit.warn(format!(
                "Configuring {count} WiFi networks using {strategy} without device owner, may fail"
            )),
            _ => self
                .audit
                .info(format!("Configuring {count} WiFi networks using {strategy}")),
        }

        match strategy {
            ProvisioningStrategy::Suggestions => self.apply_suggestions(networks, &mut report),
            _ => self.apply_direct(networks, &mut report),
        }

        let severity = if report.failed() > 0 {
            Severity::Warn
        } else {
            Severity::Info
        };
        self.audit.record(
            severity,
            format!(
                "WiFi config ({strategy}): {} added, {} failed, {} skipped",
                report.added(),
                report.failed(),
                report.skipped()
            ),
        );
        report
    }

    /// Remove every suggestion this agent submitted earlier. Returns how many.
    ///
    /// Runs before each suggestion batch so the batch replaces, rather than
    /// extends, what the platform holds.
    fn remove_all_suggestions(&self) -> usize {
        if !self.caps.is_modern() {
            return 0;
        }
        match self.wifi.network_suggestions() {
            Ok(existing) if existing.is_empty() => 0,
            Ok(existing) => match self.wifi.remove_suggestions(&existing) {
                Ok(()) => {
                    tracing::debug!(count = existing.len(), "removed Wi-Fi suggestions");
                    existing.len()
                }
                Err(e) => {
                    tracing::warn!("could not remove Wi-Fi suggestions: {e}");
                    0
                }
            },
            Err(e) => {
                tracing::warn!("could not list Wi-Fi suggestions: {e}");
                0
            }
        }
    }

    fn ensure_enabled(&self) {
        if self.wifi.is_enabled() {
            return;
        }
        if self.caps.may_enable_wifi() {
            tracing::debug!("enabling Wi-Fi for network configuration");
            if let Err(e) = self.wifi.set_enabled(true) {
                tracing::warn!("cannot enable Wi-Fi: {e}");
            }
        } else {
            tracing::debug!("Wi-Fi disabled and cannot be enabled at this privilege level");
        }
    }

    fn apply_direct(&self, networks: &[WifiNetworkSpec], report: &mut ProvisioningReport) {
        let privileged = report.strategy == ProvisioningStrategy::PrivilegedDirect;
        for spec in networks {
            let ssid = spec.ssid().unwrap_or_default();
            let descriptor = match NetworkDescriptor::build(spec) {
                Ok(descriptor) => descriptor,
                Err(reason) => {
                    self.warn_skipped(ssid, &reason);
                    report.push(ssid, Outcome::Skipped(reason));
                    continue;
                }
            };
            tracing::debug!(
                ssid,
                security = %spec.security(),
                has_password = spec.password().is_some(),
                "adding Wi-Fi network"
            );
            let added = if privileged {
                self.wifi.add_network_privileged(&descriptor)
            } else {
                self.wifi.add_network_legacy(&descriptor)
            };
            match added {
                Ok(id) if id >= 0 => {
                    let enabled = self.wifi.enable_network(id).unwrap_or(false);
                    tracing::debug!(ssid, network_id = id, enabled, "added Wi-Fi network");
                    report.push(ssid, Outcome::Added);
                }
                Ok(id) => {
                    tracing::error!(ssid, network_id = id, "add network returned an invalid id");
                    report.push(ssid, Outcome::Failed(format!("network id {id}")));
                }
                Err(e) => {
                    tracing::error!(ssid, "error adding Wi-Fi network: {e}");
                    report.push(ssid, Outcome::Failed(e.to_string()));
                }
            }
        }

        if report.added() > 0
            && let Err(e) = self.wifi.save_configuration()
        {
            self.audit.warn(format!("Failed to save WiFi configuration: {e}"));
        }
    }

    fn apply_suggestions(&self, networks: &[WifiNetworkSpec], report: &mut ProvisioningReport) {
        let removed = self.remove_all_suggestions();
        if removed > 0 {
            tracing::debug!(removed, "replacing previous Wi-Fi suggestions");
        }

        let priority_hint = self.caps.supports_priority_hint();
        let mut suggestions = Vec::new();
        for spec in networks {
            let ssid = spec.ssid().unwrap_or_default();
            match Suggestion::build(spec, priority_hint) {
                Ok(suggestion) => {
                    tracing::debug!(ssid, location = ?spec.location, "prepared Wi-Fi suggestion");
                    suggestions.push(suggestion);
                }
                Err(reason) => {
                    self.warn_skipped(ssid, &reason);
                    report.push(ssid, Outcome::Skipped(reason));
                }
            }
        }

        if suggestions.is_empty() {
            tracing::debug!("no valid Wi-Fi suggestions to add");
            return;
        }

        let status = match self.wifi.add_suggestions(&suggestions) {
            Ok(code) => SuggestionStatus::from_code(code),
            Err(e) => {
                for suggestion in &suggestions {
                    report.push(&suggestion.ssid, Outcome::Failed(e.to_string()));
                }
                return;
            }
        };
        report.suggestion_status = Some(status);
        tracing::debug!(%status, "add suggestions result");

        match status {
            SuggestionStatus::Success => {
                for suggestion in &suggestions {
                    report.push(&suggestion.ssid, Outcome::Added);
                }
            }
            SuggestionStatus::UserDisallowed => {
                self.audit.warn(
                    "WiFi suggestions not allowed, the user must enable Wi-Fi control for the agent in settings",
                );
                for suggestion in &suggestions {
                    report.push(&suggestion.ssid, Outcome::Failed(status.to_string()));
                }
            }
            _ => {
                self.audit.warn(format!("Failed to add WiFi suggestions: {status}"));
                for suggestion in &suggestions {
                    report.push(&suggestion.ssid, Outcome::Failed(status.to_string()));
                }
            }
        }
    }

    fn warn_skipped(&self, ssid: &str, reason: &SkipReason) {
        match reason {
            SkipReason::EmptySsid => tracing::warn!("skipping Wi-Fi config with empty SSID"),
            _ => self
                .audit
                .warn(format!("WiFi network {ssid} skipped: {reason}")),
        }
    }
}
