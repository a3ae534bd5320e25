use serde_json::json;

use super::engine_harness::{EngineHarness, config_in};
use kioskd::config::EnforcementBackend;
use kioskd::containment::{Grant, Verdict};
use kioskd::platform::{DeviceAction, HostDevice};

fn managed_config() -> serde_json::Value {
    json!({
        "applications": [
            { "pkg": "org.example.reader", "type": "app", "url": "https://h.example/reader.apk" },
            { "pkg": "org.example.retired", "remove": true }
        ],
        "mainApp": "org.example.kiosk",
        "kioskMode": false
    })
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn event_harness(device_config: serde_json::Value) -> EngineHarness {
    let tmp = tempfile::TempDir::new().unwrap();
    let mut config = config_in(tmp.path());
    config.containment.backend = EnforcementBackend::Event;
    EngineHarness::start_with(tmp, config, HostDevice::default(), Some(device_config))
}

#[tokio::test]
async fn allowed_set_follows_device_config() {
    let h = EngineHarness::start(HostDevice::default(), Some(managed_config()));
    let allowed = h.engine.containment().policy().allowed_set();

    assert!(allowed.contains(&h.config.agent.package));
    assert!(allowed.contains(&h.config.agent.system_ui_package));
    assert!(allowed.contains("org.example.reader"));
    assert!(allowed.contains("org.example.kiosk"));
    assert!(!allowed.contains("org.example.retired"));
    // Polling backend whitelists keyboards.
    assert!(allowed.contains("com.android.inputmethod.latin"));
}

#[tokio::test]
async fn foreign_app_is_blocked() {
    let h = EngineHarness::start(HostDevice::default(), Some(managed_config()));
    let policy = h.engine.containment().policy();
    h.device.clear_journal();

    assert_eq!(policy.evaluate("org.example.reader", now_ms()), Verdict::Allowed);
    assert_eq!(policy.evaluate("com.vendor.game", now_ms()), Verdict::Blocked);
    assert_eq!(h.journal_count(|a| *a == DeviceAction::BringHomeToFront), 1);
    assert!(h.audited("Blocked app: com.vendor.game"));
}

#[tokio::test]
async fn permissive_command_suspends_blocking() {
    let h = EngineHarness::start(HostDevice::default(), Some(managed_config()));
    h.send("permissive-mode", None).await;

    assert!(matches!(h.engine.permissive().grant(), Grant::Until(_)));
    let policy = h.engine.containment().policy();
    assert_eq!(policy.evaluate("com.vendor.game", now_ms()), Verdict::Skipped);

    let after_grant = now_ms() + i64::try_from(h.config.containment.permissive_grant_ms).unwrap() + 1;
    assert_eq!(policy.evaluate("com.vendor.game", after_grant), Verdict::Blocked);
    assert_eq!(h.engine.permissive().grant(), Grant::Off);
}

#[tokio::test]
async fn permissive_config_disables_containment() {
    let h = EngineHarness::start(HostDevice::default(), Some(json!({ "permissive": true })));
    assert_eq!(h.engine.permissive().grant(), Grant::Indefinite);
    assert_eq!(
        h.engine.containment().policy().evaluate("com.vendor.game", now_ms()),
        Verdict::Skipped
    );
}

#[tokio::test]
async fn no_config_means_no_enforcement() {
    let h = EngineHarness::start(HostDevice::default(), None);
    assert_eq!(
        h.engine.containment().policy().evaluate("com.vendor.game", now_ms()),
        Verdict::Skipped
    );
}

#[tokio::test]
async fn polling_backend_blocks_recent_foreign_usage() {
    let h = EngineHarness::start(HostDevice::default(), Some(managed_config()));
    assert_eq!(h.engine.containment().backend(), EnforcementBackend::Polling);
    assert!(h.engine.containment().is_running());

    h.device.use_app("com.vendor.game", now_ms());

    assert!(h.eventually(|h| h.audited("Blocked app: com.vendor.game")).await);
    assert!(h.journal_count(|a| *a == DeviceAction::BringHomeToFront) >= 1);
}

#[tokio::test]
async fn event_backend_debounces_repeats() {
    let h = event_harness(managed_config());
    let feed = h.engine.containment().foreground_sender().unwrap();
    h.device.clear_journal();

    feed.send("com.vendor.game".into()).unwrap();
    feed.send("com.vendor.game".into()).unwrap();
    feed.send("org.example.reader".into()).unwrap();

    assert!(h.eventually(|h| h.audited("Blocked app: com.vendor.game")).await);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(h.journal_count(|a| *a == DeviceAction::BringHomeToFront), 1);
}

#[tokio::test]
async fn event_backend_leaves_keyboards_out() {
    let h = event_harness(managed_config());
    let allowed = h.engine.containment().policy().allowed_set();
    assert!(!allowed.contains("com.android.inputmethod.latin"));
}

#[tokio::test]
async fn stop_is_idempotent() {
    let h = EngineHarness::start(HostDevice::default(), Some(managed_config()));
    h.engine.containment().stop();
    h.engine.containment().stop();
    assert!(!h.engine.containment().is_running());
    h.engine.stop();
    h.engine.stop();
    assert!(h.engine.is_stopped());
}

#[tokio::test]
async fn enter_kiosk_pins_managed_apps() {
    let h = EngineHarness::start(HostDevice::default(), Some(managed_config()));
    h.send("enter-kiosk", None).await;

    assert!(
        h.eventually(|h| h.journal_count(|a| *a == DeviceAction::StartLockTask) == 1)
            .await
    );
    assert_eq!(
        h.device.lock_task_packages(),
        vec![
            h.config.agent.package.clone(),
            "org.example.reader".to_string(),
            "org.example.kiosk".to_string(),
        ]
    );
    assert!(h.audited("Kiosk mode entered"));

    h.send("exit-kiosk", None).await;
    assert!(
        h.eventually(|h| h.journal_count(|a| *a == DeviceAction::StopLockTask) == 1)
            .await
    );
}

#[tokio::test]
async fn exit_kiosk_is_ignored_while_locked() {
    let h = EngineHarness::start(HostDevice::default(), Some(managed_config()));
    h.send("lock", None).await;
    h.send("exit-kiosk", None).await;
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(h.journal_count(|a| *a == DeviceAction::StopLockTask), 0);
}
