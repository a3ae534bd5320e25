use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::engine_harness::EngineHarness;
use kioskd::command::Command;
use kioskd::device::{AppPermissionPolicy, ExtraValue, IntentFlags};
use kioskd::events::AgentEvent;
use kioskd::platform::{DeviceAction, HostDevice};

fn shown_messages(h: &EngineHarness) -> Vec<String> {
    h.device
        .journal()
        .into_iter()
        .filter_map(|a| match a {
            DeviceAction::ShowMessage(text, _) => Some(text),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn inline_commands_run_in_arrival_order() {
    let h = EngineHarness::start(HostDevice::default(), None);
    let (tx, rx) = mpsc::channel(8);
    for text in ["first", "second", "third"] {
        tx.send(Command::text("message", text)).await.unwrap();
    }
    drop(tx);

    let dispatched = h.engine.router().run(rx, CancellationToken::new()).await;

    assert_eq!(dispatched, 3);
    assert_eq!(shown_messages(&h), vec!["first", "second", "third"]);
    assert!(h.audited("Got Push Message, type message"));
    assert!(h.audited("Message displayed: second"));
}

#[tokio::test]
async fn cancelled_router_takes_nothing() {
    let h = EngineHarness::start(HostDevice::default(), None);
    let (tx, rx) = mpsc::channel(8);
    tx.send(Command::text("message", "late")).await.unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert_eq!(h.engine.router().run(rx, cancel).await, 0);
    assert!(shown_messages(&h).is_empty());
}

#[tokio::test]
async fn malformed_payload_is_audited_and_processing_continues() {
    let h = EngineHarness::start(HostDevice::default(), None);

    h.send("run-command", None).await;
    h.send("message", Some(json!("still here"))).await;

    assert!(h.audited("Command run-command failed"));
    assert_eq!(shown_messages(&h), vec!["still here"]);
}

#[tokio::test]
async fn run_command_audits_output() {
    let h = EngineHarness::start(HostDevice::default(), None);
    h.send("run-command", Some(json!({ "command": "uptime" }))).await;

    assert_eq!(h.journal_count(|a| *a == DeviceAction::Shell("uptime".into())), 1);
    assert!(h.audited("Executed a command: uptime"));
}

#[tokio::test]
async fn unknown_type_goes_to_extensions() {
    let h = EngineHarness::start(HostDevice::default(), None);
    let mut events = h.engine.events().subscribe();

    h.send("com.vendor.sync", Some(json!({ "batch": 7 }))).await;

    assert_eq!(
        events.recv().await.unwrap(),
        AgentEvent::Extension {
            message_type: "com.vendor.sync".into(),
            payload: Some(json!({ "batch": 7 })),
        }
    );
    let broadcast = h
        .device
        .journal()
        .into_iter()
        .find_map(|a| match a {
            DeviceAction::Broadcast(intent) => Some(intent),
            _ => None,
        })
        .unwrap();
    assert_eq!(broadcast.action.as_deref(), Some("com.hmdm.push.com.vendor.sync"));
    assert_eq!(
        broadcast.extras.get("com.hmdm.PUSH_DATA"),
        Some(&ExtraValue::Str(r#"{"batch":7}"#.into()))
    );
}

#[tokio::test]
async fn run_app_launches_installed_package() {
    let device = HostDevice::default();
    device.install("org.example.reader");
    let h = EngineHarness::start(device, None);

    h.send(
        "run-app",
        Some(json!({ "pkg": "org.example.reader", "data": "https://h.example/page", "extra": { "page": 3 } })),
    )
    .await;
    h.send("run-app", Some(json!({ "pkg": "org.example.missing" }))).await;

    let started: Vec<_> = h
        .device
        .journal()
        .into_iter()
        .filter_map(|a| match a {
            DeviceAction::StartActivity(intent) => Some(intent),
            _ => None,
        })
        .collect();
    assert_eq!(started.len(), 1);
    assert_eq!(started[0].package.as_deref(), Some("org.example.reader"));
    assert_eq!(started[0].data.as_deref(), Some("https://h.example/page"));
    assert_eq!(started[0].extras.get("page"), Some(&ExtraValue::Int(3)));
    assert!(started[0].flags.contains(IntentFlags::NEW_TASK));
    assert!(!h.audited("Command run-app failed"));
}

#[tokio::test]
async fn open_url_prefers_known_browser() {
    let device = HostDevice::default();
    device.install("com.android.chrome");
    let h = EngineHarness::start(device, None);

    h.send("open-url", Some(json!("https://h.example/news"))).await;

    let opened = h
        .device
        .journal()
        .into_iter()
        .find_map(|a| match a {
            DeviceAction::StartActivity(intent) => Some(intent),
            _ => None,
        })
        .unwrap();
    assert_eq!(opened.package.as_deref(), Some("com.android.chrome"));
    assert_eq!(opened.data.as_deref(), Some("https://h.example/news"));

    h.send("open-url", Some(json!("not a url"))).await;
    assert!(h.audited("Command open-url failed"));
}

#[tokio::test]
async fn uninstall_needs_device_owner() {
    let device = HostDevice::new(false, 33);
    device.install("org.example.reader");
    let h = EngineHarness::start(device, None);

    h.send("uninstall-app", Some(json!({ "pkg": "org.example.reader" }))).await;

    assert_eq!(h.journal_count(|a| matches!(a, DeviceAction::Uninstall(_))), 0);
    assert!(h.audited("insufficient privilege"));
}

#[tokio::test]
async fn grant_permissions_uses_config_policy() {
    let h = EngineHarness::start(
        HostDevice::default(),
        Some(json!({
            "appPermissions": "DENYLOCATION",
            "applications": [
                { "pkg": "org.example.reader", "type": "app", "url": "https://h.example/r.apk" },
                { "pkg": "org.example.portal", "type": "web", "url": "https://h.example" }
            ]
        })),
    );

    h.send("grant-permissions", None).await;

    assert_eq!(
        h.device
            .journal()
            .into_iter()
            .filter(|a| matches!(a, DeviceAction::GrantPermissions(..)))
            .collect::<Vec<_>>(),
        vec![DeviceAction::GrantPermissions(
            "org.example.reader".into(),
            AppPermissionPolicy::DenyLocation
        )]
    );
}

#[tokio::test]
async fn clear_app_data_needs_platform_support() {
    let h = EngineHarness::start(HostDevice::new(true, 26), None);
    h.send("clear-app-data", Some(json!({ "pkg": "org.example.reader" }))).await;

    assert_eq!(h.journal_count(|a| matches!(a, DeviceAction::ClearAppData(_))), 0);
    assert!(h.audited("Clearing app data for org.example.reader"));
    assert!(h.audited("unsupported in SDK 26"));
}

#[tokio::test]
async fn file_commands_stay_under_storage_root() {
    let h = EngineHarness::start(HostDevice::default(), None);
    let root = h.config.storage.external_root();
    std::fs::create_dir_all(root.join("media/old")).unwrap();
    std::fs::write(root.join("media/a.mp4"), b"a").unwrap();
    std::fs::write(root.join("media/old/b.mp4"), b"b").unwrap();
    std::fs::write(root.join("report.pdf"), b"r").unwrap();

    h.send("delete-file", Some(json!({ "path": "/report.pdf" }))).await;
    assert!(!root.join("report.pdf").exists());
    assert!(h.audited("Deleted file: /report.pdf"));

    h.send("purge-dir", Some(json!({ "path": "media" }))).await;
    assert!(!root.join("media/a.mp4").exists());
    assert!(root.join("media/old/b.mp4").exists());

    h.send("purge-dir", Some(json!({ "path": "media", "recursive": "1" }))).await;
    assert!(!root.join("media/old").exists());
    assert!(root.join("media").is_dir());

    h.send("delete-dir", Some(json!({ "path": "../boot" }))).await;
    assert!(h.audited("path escapes the storage root"));
}

#[tokio::test]
async fn clear_downloads_forgets_history() {
    let device = HostDevice::default();
    let h = EngineHarness::start(device, None);
    let file = h.tmp.path().join("download.apk");
    std::fs::write(&file, b"apk").unwrap();
    h.device.add_download(file.clone());
    h.device.add_download(h.tmp.path().join("gone.apk"));

    h.send("clear-downloads", None).await;

    assert!(!file.exists());
    assert_eq!(h.journal_count(|a| *a == DeviceAction::ForgetDownloads), 1);
}

#[tokio::test]
async fn reboot_and_admin_panel() {
    let h = EngineHarness::start(HostDevice::default(), None);
    h.send("reboot", None).await;
    h.send("admin-panel", None).await;

    assert_eq!(h.journal_count(|a| *a == DeviceAction::Reboot), 1);
    assert!(h.audited("Rebooting by a Push message"));
    assert!(
        h.eventually(|h| h.journal_count(|a| *a == DeviceAction::ShowAdminPanel) == 1)
            .await
    );
}

#[tokio::test]
async fn attention_uses_configured_timeout() {
    let h = EngineHarness::start(HostDevice::default(), None);
    h.send("attention", None).await;
    assert_eq!(
        h.journal_count(|a| *a
            == DeviceAction::ShowAttention(Duration::from_millis(
                h.config.presentation.attention_timeout_ms
            ))),
        1
    );
}
