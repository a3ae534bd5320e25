use std::time::Duration;

use serde_json::json;

use super::engine_harness::EngineHarness;
use kioskd::device::AudioStream;
use kioskd::emergency::{LocationProvider, LocationSample};
use kioskd::platform::{DeviceAction, HostDevice};

fn device_with_fix() -> HostDevice {
    let device = HostDevice::default();
    device.set_stream_volume_raw(AudioStream::Alarm, 4);
    device.set_last_known(LocationSample::new(
        52.370_2,
        4.895_2,
        LocationProvider::Gps,
        1_700_000_000_000,
    ));
    device
}

#[tokio::test(start_paused = true)]
async fn emergency_pings_on_interval_and_restores_volume() {
    let h = EngineHarness::start(device_with_fix(), None);

    h.send("emergency-mode", Some(json!("on:5000"))).await;
    let emergency = h.engine.emergency();
    assert!(emergency.is_active());
    assert_eq!(emergency.ping_interval(), Some(Duration::from_millis(5_000)));
    assert_eq!(h.device.stream_volume_of(AudioStream::Alarm), 15);
    assert_eq!(h.device.stream_volume_of(AudioStream::Music), 15);
    assert_eq!(h.journal_count(|a| *a == DeviceAction::AlertToneStarted), 1);

    tokio::time::sleep(Duration::from_millis(12_000)).await;
    let pings = emergency.ping_attempts();
    assert!((2..=3).contains(&pings), "expected 2-3 pings, got {pings}");
    assert!(h.eventually(|h| h.uplink.batch_count() >= 2).await);

    h.send("emergency-mode", Some(json!("off"))).await;
    assert!(!emergency.is_active());
    assert_eq!(h.device.stream_volume_of(AudioStream::Alarm), 4);
    assert_eq!(h.journal_count(|a| *a == DeviceAction::AlertToneStopped), 1);

    tokio::time::sleep(Duration::from_millis(20_000)).await;
    assert_eq!(emergency.ping_attempts(), pings, "no pings after deactivation");
}

#[tokio::test(start_paused = true)]
async fn reactivation_only_changes_the_interval() {
    let h = EngineHarness::start(device_with_fix(), None);

    h.send("emergency-mode", Some(json!("on:5000"))).await;
    h.send("emergency-mode", Some(json!("on:2000"))).await;

    let emergency = h.engine.emergency();
    assert!(emergency.is_active());
    assert_eq!(emergency.ping_interval(), Some(Duration::from_millis(2_000)));
    assert_eq!(h.journal_count(|a| *a == DeviceAction::AlertToneStarted), 1);

    h.send("emergency-mode", Some(json!("off"))).await;
    // Both emergency registrations are released.
    assert_eq!(
        h.journal_count(|a| matches!(a, DeviceAction::RemoveLocationUpdates(_))),
        2
    );
}

#[tokio::test(start_paused = true)]
async fn interval_is_clamped_to_minimum() {
    let h = EngineHarness::start(device_with_fix(), None);
    h.send("emergency-mode", Some(json!("on:10"))).await;
    assert_eq!(
        h.engine.emergency().ping_interval(),
        Some(Duration::from_millis(h.config.emergency.min_ping_interval_ms))
    );
}

#[tokio::test(start_paused = true)]
async fn missing_tone_does_not_block_activation() {
    let device = device_with_fix();
    device.faults(|f| f.alert_tone = true);
    let h = EngineHarness::start(device, None);

    h.send("emergency-mode", Some(json!("on"))).await;
    assert!(h.engine.emergency().is_active());
    assert!(h.audited("Failed to play emergency alarm"));

    h.send("emergency-mode", Some(json!("off"))).await;
    assert!(!h.engine.emergency().is_active());
}

#[tokio::test]
async fn malformed_directive_is_reported() {
    let h = EngineHarness::start(HostDevice::default(), None);
    h.send("emergency-mode", Some(json!("maybe"))).await;
    assert!(!h.engine.emergency().is_active());
    assert!(h.audited("Command emergency-mode failed"));
}

#[tokio::test]
async fn ping_location_sends_best_fix_once() {
    let h = EngineHarness::start(device_with_fix(), None);
    h.send("ping-location", None).await;
    assert_eq!(h.uplink.batch_count(), 1);
    assert_eq!(h.uplink.samples()[0].provider, LocationProvider::Gps);
}
