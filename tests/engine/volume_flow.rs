use serde_json::json;

use super::engine_harness::EngineHarness;
use kioskd::platform::{DeviceAction, HostDevice};

fn volume_actions(h: &EngineHarness) -> Vec<DeviceAction> {
    h.device
        .journal()
        .into_iter()
        .filter(|a| {
            matches!(
                a,
                DeviceAction::VolumeLocked(_) | DeviceAction::VolumePercent(_)
            )
        })
        .collect()
}

#[tokio::test]
async fn locked_volume_is_lifted_and_restored() {
    let h = EngineHarness::start(HostDevice::default(), Some(json!({ "lockVolume": true })));
    h.device.clear_journal();

    h.send("set-volume", Some(json!("8"))).await;

    assert_eq!(
        volume_actions(&h),
        vec![
            DeviceAction::VolumeLocked(false),
            DeviceAction::VolumePercent(53),
            DeviceAction::VolumeLocked(true),
        ]
    );
    assert!(h.audited("Set volume to 53%"));
}

#[tokio::test]
async fn policy_lock_alone_triggers_relock() {
    let device = HostDevice::default();
    device.set_volume_locked_raw(true);
    let h = EngineHarness::start(device, None);

    h.send("set-volume", Some(json!(15))).await;

    assert_eq!(
        volume_actions(&h),
        vec![
            DeviceAction::VolumeLocked(false),
            DeviceAction::VolumePercent(100),
            DeviceAction::VolumeLocked(true),
        ]
    );
}

#[tokio::test]
async fn level_is_clamped() {
    let h = EngineHarness::start(HostDevice::default(), None);
    h.send("set-volume", Some(json!("40"))).await;
    h.send("set-volume", Some(json!("-3"))).await;
    assert_eq!(
        volume_actions(&h),
        vec![DeviceAction::VolumePercent(100), DeviceAction::VolumePercent(0)]
    );
}

#[tokio::test]
async fn shell_fallback_when_volume_control_fails() {
    let device = HostDevice::default();
    device.faults(|f| f.volume_control = true);
    let h = EngineHarness::start(device, None);

    h.send("set-volume", Some(json!("8"))).await;

    assert_eq!(
        h.journal_count(|a| *a == DeviceAction::Shell("media volume --stream 3 --set 8".into())),
        1
    );
    assert!(h.audited("Set volume via shell"));
}

#[tokio::test]
async fn non_numeric_volume_is_reported() {
    let h = EngineHarness::start(HostDevice::default(), None);
    h.send("set-volume", Some(json!("loud"))).await;
    assert!(volume_actions(&h).is_empty());
    assert!(h.audited("Invalid volume value"));
}

#[tokio::test]
async fn brightness_falls_back_to_settings_without_owner() {
    let h = EngineHarness::start(HostDevice::new(false, 33), None);
    h.send("set-brightness", Some(json!("300"))).await;

    let shell: Vec<_> = h
        .device
        .journal()
        .into_iter()
        .filter_map(|a| match a {
            DeviceAction::Shell(cmd) => Some(cmd),
            _ => None,
        })
        .collect();
    assert_eq!(
        shell,
        vec![
            "settings put system screen_brightness_mode 0".to_string(),
            "settings put system screen_brightness 255".to_string(),
        ]
    );
}

#[tokio::test]
async fn brightness_uses_policy_when_owner() {
    let h = EngineHarness::start(HostDevice::default(), None);
    h.send("set-brightness", Some(json!(128))).await;
    assert_eq!(h.journal_count(|a| *a == DeviceAction::Brightness(128)), 1);
}
