use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use super::engine_harness::{EngineHarness, config_in};
use kioskd::device::{PlatformResult, Presenter};
use kioskd::events::AgentEvent;
use kioskd::lock::{LockState, LockStateStore, hash_pin};
use kioskd::platform::{DeviceAction, HostDevice};

#[tokio::test]
async fn fresh_store_reads_unlocked_and_round_trips() {
    let tmp = tempfile::TempDir::new().unwrap();
    let store = LockStateStore::open(&tmp.path().join("boot"));
    assert!(!store.read().unwrap());

    store.write(true).unwrap();
    assert!(LockStateStore::open(&tmp.path().join("boot")).read().unwrap());
    store.write(false).unwrap();
    assert!(!store.read().unwrap());
}

/// Presenter that notes the persisted lock flag each time the lock surface
/// is raised.
struct StoreCheckingPresenter {
    inner: Arc<dyn Presenter>,
    store: LockStateStore,
    persisted_on_show: Mutex<Vec<bool>>,
}

impl Presenter for StoreCheckingPresenter {
    fn show_lock_surface(&self) -> PlatformResult<()> {
        let persisted = self.store.read().unwrap_or(false);
        self.persisted_on_show.lock().unwrap().push(persisted);
        self.inner.show_lock_surface()
    }

    fn dismiss_lock_surface(&self) -> PlatformResult<()> {
        self.inner.dismiss_lock_surface()
    }

    fn is_lock_surface_shown(&self) -> bool {
        self.inner.is_lock_surface_shown()
    }

    fn show_attention(&self, timeout: Duration) -> PlatformResult<()> {
        self.inner.show_attention(timeout)
    }

    fn show_message(&self, text: &str, timeout: Duration) -> PlatformResult<()> {
        self.inner.show_message(text, timeout)
    }

    fn show_admin_panel(&self) -> PlatformResult<()> {
        self.inner.show_admin_panel()
    }
}

fn is_lock_action(action: &DeviceAction) -> bool {
    matches!(
        action,
        DeviceAction::ShowLockSurface
            | DeviceAction::DismissLockSurface
            | DeviceAction::LockTaskPackages(_)
            | DeviceAction::StartLockTask
            | DeviceAction::StopLockTask
    )
}

#[tokio::test]
async fn lock_persists_before_presenting() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = config_in(tmp.path());
    let presenter = Arc::new(Mutex::new(None::<Arc<StoreCheckingPresenter>>));
    let slot = presenter.clone();
    let h = EngineHarness::start_customized(
        tmp,
        config,
        HostDevice::default(),
        None,
        move |config, platform| {
            let checking = Arc::new(StoreCheckingPresenter {
                inner: platform.presenter.clone(),
                store: LockStateStore::open(&config.storage.boot_dir()),
                persisted_on_show: Mutex::new(Vec::new()),
            });
            platform.presenter = checking.clone();
            *slot.lock().unwrap() = Some(checking);
        },
    );
    let presenter = presenter.lock().unwrap().clone().unwrap();
    h.device.clear_journal();

    h.send("lock", None).await;

    assert_eq!(*presenter.persisted_on_show.lock().unwrap(), vec![true]);
    assert_eq!(h.engine.lock().state(), LockState::Locked);
    let lock_actions: Vec<_> = h
        .device
        .journal()
        .into_iter()
        .filter(is_lock_action)
        .collect();
    assert_eq!(
        lock_actions,
        vec![
            DeviceAction::ShowLockSurface,
            DeviceAction::LockTaskPackages(vec![h.config.agent.package.clone()]),
            DeviceAction::StartLockTask,
        ]
    );
    assert!(h.audited("Lock screen displayed"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lock_then_unlock_keeps_arrival_order() {
    let h = EngineHarness::start(HostDevice::default(), None);
    let store = LockStateStore::open(&h.config.storage.boot_dir());

    for _ in 0..50 {
        let locking = h.dispatch("lock", None).await;
        let unlocking = h.dispatch("unlock", None).await;
        for handle in [locking, unlocking].into_iter().flatten() {
            handle.await.unwrap();
        }
        assert_eq!(h.engine.lock().state(), LockState::Unlocked);
        assert!(!store.read().unwrap());
        assert!(!h.device.is_lock_surface_shown());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unlock_then_lock_ends_locked() {
    let h = EngineHarness::start(HostDevice::default(), None);
    let store = LockStateStore::open(&h.config.storage.boot_dir());

    for _ in 0..20 {
        let unlocking = h.dispatch("unlock", None).await;
        let locking = h.dispatch("lock", None).await;
        for handle in [unlocking, locking].into_iter().flatten() {
            handle.await.unwrap();
        }
        assert_eq!(h.engine.lock().state(), LockState::Locked);
        assert!(store.read().unwrap());
        assert!(h.device.is_lock_surface_shown());
    }
}

#[tokio::test]
async fn lock_is_idempotent() {
    let h = EngineHarness::start(HostDevice::default(), None);
    let mut events = h.engine.events().subscribe();

    h.send("lock", None).await;
    h.send("lock", None).await;

    assert_eq!(h.journal_count(|a| *a == DeviceAction::ShowLockSurface), 1);
    assert_eq!(h.journal_count(|a| *a == DeviceAction::StartLockTask), 1);
    assert_eq!(
        events.try_recv().unwrap(),
        AgentEvent::LockChanged { locked: true }
    );
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn locked_state_survives_restart() {
    let h = EngineHarness::start(HostDevice::default(), None);
    h.send("lock", None).await;

    let h = h.restart(HostDevice::default());

    assert!(h.engine.locked_at_boot());
    assert!(h.engine.lock().is_locked());
    assert_eq!(h.device.journal().first(), Some(&DeviceAction::ShowLockSurface));
    assert_eq!(h.journal_count(|a| *a == DeviceAction::ShowLockSurface), 1);
}

#[tokio::test]
async fn unlock_clears_persisted_state() {
    let h = EngineHarness::start(HostDevice::default(), None);
    h.send("lock", None).await;
    let mut events = h.engine.events().subscribe();

    h.send("unlock", None).await;

    assert!(!h.engine.lock().is_locked());
    assert!(h.device.journal().contains(&DeviceAction::DismissLockSurface));
    assert!(h.device.journal().contains(&DeviceAction::StopLockTask));
    assert!(h.device.journal().contains(&DeviceAction::KeyguardDisabled(true)));
    assert_eq!(events.try_recv().unwrap(), AgentEvent::ExitKiosk);
    assert!(h.audited("Device unlocked and kiosk mode exited"));

    let h = h.restart(HostDevice::default());
    assert!(!h.engine.locked_at_boot());
    assert!(!h.engine.lock().is_locked());
    assert_eq!(h.journal_count(|a| *a == DeviceAction::ShowLockSurface), 0);
}

#[tokio::test]
async fn unlock_while_unlocked_still_clears_store() {
    let h = EngineHarness::start(HostDevice::default(), None);
    let store = LockStateStore::open(&h.config.storage.boot_dir());
    store.write(true).unwrap();

    h.send("unlock", None).await;

    assert!(!store.read().unwrap());
}

#[tokio::test]
async fn pin_unlock_uses_configured_hash() {
    let h = EngineHarness::start(
        HostDevice::default(),
        Some(json!({ "password": hash_pin("2468") })),
    );
    h.send("lock", None).await;

    assert!(!h.engine.lock().submit_pin("12345678"));
    assert!(h.engine.lock().is_locked());
    assert!(h.audited("Wrong unlock PIN entered"));

    assert!(h.engine.lock().submit_pin("2468"));
    assert!(!h.engine.lock().is_locked());
}

#[tokio::test]
async fn default_pin_applies_without_configured_hash() {
    let h = EngineHarness::start(HostDevice::default(), None);
    h.send("lock", None).await;
    assert!(h.engine.lock().submit_pin(kioskd::lock::DEFAULT_PIN));
    assert!(!h.engine.lock().is_locked());
}
