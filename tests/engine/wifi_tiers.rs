use serde_json::json;

use super::engine_harness::EngineHarness;
use kioskd::device::ConfigProvider;
use kioskd::platform::{DeviceAction, HostDevice};
use kioskd::wifi::{Outcome, ProvisioningStrategy, SecurityType, SkipReason, WifiNetworkSpec};

fn wifi_config() -> serde_json::Value {
    json!({
        "wifi": [
            { "ssid": "Office", "securityType": "WPA2", "password": "correct-horse" },
            { "ssid": "Lobby", "securityType": "OPEN" },
            { "ssid": "Broken", "securityType": "WPA2" }
        ]
    })
}

fn tier_harness(owner: bool, sdk: u32) -> EngineHarness {
    EngineHarness::start(HostDevice::new(owner, sdk), Some(wifi_config()))
}

fn added(h: &EngineHarness) -> (usize, usize, usize) {
    (
        h.journal_count(|a| matches!(a, DeviceAction::AddNetworkPrivileged(_))),
        h.journal_count(|a| matches!(a, DeviceAction::AddNetworkLegacy(_))),
        h.journal_count(|a| matches!(a, DeviceAction::AddSuggestions(_))),
    )
}

#[tokio::test]
async fn owner_on_modern_platform_adds_directly() {
    let h = tier_harness(true, 33);
    assert_eq!(h.engine.provisioner().strategy(), ProvisioningStrategy::PrivilegedDirect);
    assert_eq!(added(&h), (2, 0, 0));
    assert_eq!(h.journal_count(|a| *a == DeviceAction::SaveWifiConfiguration), 1);
}

#[tokio::test]
async fn owner_on_legacy_platform_uses_legacy_add() {
    let h = tier_harness(true, 28);
    assert_eq!(h.engine.provisioner().strategy(), ProvisioningStrategy::PrivilegedLegacy);
    assert_eq!(added(&h), (0, 2, 0));
}

#[tokio::test]
async fn standard_on_modern_platform_submits_suggestions() {
    let h = tier_harness(false, 33);
    assert_eq!(h.engine.provisioner().strategy(), ProvisioningStrategy::Suggestions);
    assert_eq!(added(&h), (0, 0, 1));
    let submitted = h
        .device
        .journal()
        .into_iter()
        .find_map(|a| match a {
            DeviceAction::AddSuggestions(s) => Some(s.len()),
            _ => None,
        });
    assert_eq!(submitted, Some(2));
}

#[tokio::test]
async fn standard_on_legacy_platform_warns_and_tries() {
    let h = tier_harness(false, 26);
    assert_eq!(h.engine.provisioner().strategy(), ProvisioningStrategy::LegacyBestEffort);
    assert_eq!(added(&h), (0, 2, 0));
    assert!(h.audited("without device owner, may fail"));
}

#[tokio::test]
async fn missing_password_is_skipped_not_failed() {
    let h = tier_harness(true, 33);
    let report = h
        .engine
        .provisioner()
        .apply(&[WifiNetworkSpec::new("Broken", "WPA2", None)]);
    assert_eq!(report.added(), 0);
    assert_eq!(report.failed(), 0);
    assert_eq!(
        report.outcome_of("Broken"),
        Some(&Outcome::Skipped(SkipReason::MissingPassword(SecurityType::Wpa2)))
    );
}

#[tokio::test]
async fn failing_network_does_not_stop_the_rest() {
    let device = HostDevice::new(true, 33);
    device.faults(|f| {
        f.add_network_for.insert("Office".into());
    });
    let h = EngineHarness::start(device, Some(wifi_config()));

    assert_eq!(added(&h), (2, 0, 0));
    assert!(h.audited("1 added, 1 failed, 1 skipped"));
}

#[tokio::test]
async fn config_update_reprovisions() {
    let h = EngineHarness::start(HostDevice::new(true, 33), None);
    assert_eq!(added(&h), (0, 0, 0));

    super::engine_harness::write_device_config(&h.config, &wifi_config());
    h.send("config-updated", None).await;

    assert!(h.eventually(|h| added(h).0 == 2).await);
    assert!(h.engine.device_config().current().is_some());
}
