use super::pin::verify_pin;
use super::store::LockStateStore;
use crate::audit::AuditLog;
use crate::device::{Capabilities, ConfigProvider, DevicePolicy, LockTaskFeatures, Presenter};
use crate::events::{AgentEvent, EventBus};
use std::sync::{Arc, Mutex, MutexGuard};
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LockState {
    Unlocked,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum UnlockTrigger {
    Command,
    Pin,
    Privileged,
}

/// Owns the lock state. The only writer of the persisted record.
pub struct LockStateMachine {
    store: LockStateStore,
    policy: Arc<dyn DevicePolicy>,
    presenter: Arc<dyn Presenter>,
    config: Arc<dyn ConfigProvider>,
    caps: Capabilities,
    agent_package: String,
    events: EventBus,
    audit: AuditLog,
    state: Mutex<LockState>,
    /// Held for the whole of a lock or unlock so transitions never interleave.
    transition: Mutex<()>,
}

impl LockStateMachine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: LockStateStore,
        policy: Arc<dyn DevicePolicy>,
        presenter: Arc<dyn Presenter>,
        config: Arc<dyn ConfigProvider>,
        caps: Capabilities,
        agent_package: impl Into<String>,
        events: EventBus,
        audit: AuditLog,
    ) -> Self {
        Self {
            store,
            policy,
            presenter,
            config,
            caps,
            agent_package: agent_package.into(),
            events,
            audit,
            state: Mutex::new(LockState::Unlocked),
            transition: Mutex::new(()),
        }
    }

    pub fn state(&self) -> LockState {
        *self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn is_locked(&self) -> bool {
        self.state() == LockState::Locked
    }

    /// Run `f` only if unlocked, with no lock transition allowed in between.
    pub fn while_unlocked<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        let _transition = self.begin_transition();
        (!self.is_locked()).then(f)
    }

    /// Persist first, then present, then restrict. Idempotent.
    pub fn lock(&self) {
        let _transition = self.begin_transition();
        self.apply_lock();
    }

    fn apply_lock(&self) {
        if let Err(e) = self.store.write(true) {
            self.audit.error(format!("Failed to persist lock state: {e}"));
        }

        if !self.presenter.is_lock_surface_shown()
            && let Err(e) = self.presenter.show_lock_surface()
        {
            self.audit.error(format!("Failed to show lock screen: {e}"));
        }

        self.enter_restrictive_mode();

        let previous = self.set_state(LockState::Locked);
        if previous != LockState::Locked {
            self.events.publish(AgentEvent::LockChanged { locked: true });
            self.audit.info("Device locked");
        }
    }

    /// Clear persisted state, lift restrictions, dismiss the surface and
    /// announce the kiosk exit. Persisted state is cleared even when the
    /// machine already believes it is unlocked.
    pub fn unlock(&self, trigger: UnlockTrigger) {
        let _transition = self.begin_transition();
        if let Err(e) = self.store.write(false) {
            self.audit.error(format!("Failed to clear lock state: {e}"));
        }

        self.leave_restrictive_mode();

        if self.presenter.is_lock_surface_shown()
            && let Err(e) = self.presenter.dismiss_lock_surface()
        {
            self.audit.warn(format!("Failed to dismiss lock screen: {e}"));
        }

        let previous = self.set_state(LockState::Unlocked);
        self.events.publish(AgentEvent::ExitKiosk);
        if previous == LockState::Locked {
            self.events.publish(AgentEvent::LockChanged { locked: false });
            self.audit.info(format!("Device unlocked ({trigger})"));
        }
    }

    /// PIN entered on the lock surface. Returns whether it unlocked.
    pub fn submit_pin(&self, entered: &str) -> bool {
        let config = self.config.current();
        let stored = config.as_deref().and_then(|c| c.password_hash());
        if verify_pin(entered, stored) {
            self.unlock(UnlockTrigger::Pin);
            true
        } else {
            self.audit.warn("Wrong unlock PIN entered");
            false
        }
    }

    /// Re-read persisted state and converge. Safe to call any number of
    /// times. Returns the persisted flag.
    pub fn recheck_persisted(&self) -> bool {
        let _transition = self.begin_transition();
        let persisted = match self.store.read() {
            Ok(locked) => locked,
            Err(e) => {
                self.audit.warn(format!("Failed to read lock state: {e}"));
                return self.is_locked();
            }
        };
        if persisted && (!self.is_locked() || !self.presenter.is_lock_surface_shown()) {
            tracing::info!("persisted lock state found, locking");
            self.apply_lock();
        }
        persisted
    }

    fn enter_restrictive_mode(&self) {
        if self.caps.is_elevated() {
            if let Err(e) = self
                .policy
                .set_lock_task_packages(std::slice::from_ref(&self.agent_package))
            {
                tracing::warn!("failed to set lock task packages: {e}");
            }
            if self.caps.supports_lock_task_features()
                && let Err(e) = self.policy.set_lock_task_features(LockTaskFeatures::NONE)
            {
                tracing::warn!("failed to disable lock task features: {e}");
            }
        }
        if !self.policy.is_lock_task_active()
            && let Err(e) = self.policy.start_lock_task()
        {
            self.audit.warn(format!("Failed to start lock task mode: {e}"));
        }
    }

    fn leave_restrictive_mode(&self) {
        if self.caps.is_elevated()
            && self.caps.supports_lock_task_features()
            && let Err(e) = self
                .policy
                .set_lock_task_features(LockTaskFeatures::UNLOCKED_DEFAULT)
        {
            tracing::warn!("failed to restore lock task features: {e}");
        }
        if self.policy.is_lock_task_active()
            && let Err(e) = self.policy.stop_lock_task()
        {
            tracing::warn!("failed to stop lock task mode: {e}");
        }
    }

    fn begin_transition(&self) -> MutexGuard<'_, ()> {
        self.transition
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn set_state(&self, next: LockState) -> LockState {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::mem::replace(&mut *state, next)
    }
}
