use super::policy::{ContainmentPolicy, Verdict};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Foreground-change driven enforcement. Called from the platform's event
/// thread; never blocks beyond the policy check.
pub struct EventEnforcer {
    policy: Arc<ContainmentPolicy>,
    cooldown: Duration,
    last_block: Mutex<Option<(String, i64)>>,
}

impl EventEnforcer {
    pub fn new(policy: Arc<ContainmentPolicy>, cooldown: Duration) -> Self {
        Self {
            policy,
            cooldown,
            last_block: Mutex::new(None),
        }
    }

    pub fn on_foreground_changed(&self, package: &str, now_ms: i64) -> Verdict {
        if package.is_empty() {
            return Verdict::Skipped;
        }
        if self.recently_blocked(package, now_ms) {
            tracing::trace!(package, "block debounced");
            return Verdict::Debounced;
        }
        let verdict = self.policy.evaluate(package, now_ms);
        if verdict == Verdict::Blocked {
            *self
                .last_block
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) =
                Some((package.to_string(), now_ms));
        }
        verdict
    }

    fn recently_blocked(&self, package: &str, now_ms: i64) -> bool {
        let last = self
            .last_block
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let cooldown = i64::try_from(self.cooldown.as_millis()).unwrap_or(i64::MAX);
        matches!(&*last, Some((p, at)) if p == package && now_ms.saturating_sub(*at) < cooldown)
    }
}
