use super::policy::{ContainmentPolicy, Verdict};
use crate::device::UsageStats;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Periodic enforcement from usage statistics: the most recently used
/// package inside the trailing window is treated as the foreground.
pub struct PollingEnforcer {
    policy: Arc<ContainmentPolicy>,
    usage: Arc<dyn UsageStats>,
    interval: Duration,
    window: Duration,
}

impl PollingEnforcer {
    pub fn new(
        policy: Arc<ContainmentPolicy>,
        usage: Arc<dyn UsageStats>,
        interval: Duration,
        window: Duration,
    ) -> Self {
        Self {
            policy,
            usage,
            interval,
            window,
        }
    }

    /// One check. No usage data in the window is nothing to enforce.
    pub fn tick(&self, now_ms: i64) -> Verdict {
        let window = i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX);
        let Some(samples) = self.usage.query(now_ms.saturating_sub(window), now_ms) else {
            return Verdict::Skipped;
        };
        let Some(latest) = samples.iter().max_by_key(|s| s.last_used_ms) else {
            return Verdict::Skipped;
        };
        self.policy.evaluate(&latest.package, now_ms)
    }

    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(interval_ms = %self.interval.as_millis(), "polling enforcer started");
            loop {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.tick(chrono::Utc::now().timestamp_millis());
                    }
                }
            }
            tracing::info!("polling enforcer stopped");
        })
    }
}
