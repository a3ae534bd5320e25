use std::sync::Mutex;
use std::time::Duration;

/// Current permissive grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grant {
    #[default]
    Off,
    /// Active until this wall-clock time (ms since epoch).
    Until(i64),
    /// Active until cleared; set from configuration.
    Indefinite,
}

/// Process-wide permissive flag. Every access is a single read or replace
/// under the mutex.
#[derive(Debug, Default)]
pub struct PermissiveMode {
    grant: Mutex<Grant>,
}

impl PermissiveMode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self) -> Grant {
        *self.lock()
    }

    /// Timed grant starting at `now_ms`. An indefinite grant is kept.
    pub fn grant_for(&self, duration: Duration, now_ms: i64) {
        let span = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
        self.grant_until(now_ms.saturating_add(span));
    }

    pub fn grant_until(&self, end_ms: i64) {
        let mut grant = self.lock();
        if *grant != Grant::Indefinite {
            *grant = Grant::Until(end_ms);
        }
    }

    /// Mirror the configuration-level flag. Turning it off clears only an
    /// indefinite grant; a running timed grant stays.
    pub fn set_indefinite(&self, enabled: bool) {
        let mut grant = self.lock();
        match (enabled, *grant) {
            (true, _) => *grant = Grant::Indefinite,
            (false, Grant::Indefinite) => *grant = Grant::Off,
            (false, _) => {}
        }
    }

    pub fn clear(&self) {
        *self.lock() = Grant::Off;
    }

    /// Whether the grant covers `now_ms`. An expired timed grant is cleared
    /// here.
    pub fn is_active(&self, now_ms: i64) -> bool {
        let mut grant = self.lock();
        match *grant {
            Grant::Off => false,
            Grant::Indefinite => true,
            Grant::Until(end) if now_ms > end => {
                tracing::debug!(end, now_ms, "permissive grant expired");
                *grant = Grant::Off;
                false
            }
            Grant::Until(_) => true,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Grant> {
        self.grant
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
