use anyhow::Result;
use std::future::Future;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// When a supervised component is started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RestartPolicy {
    /// Restart after errors only; a clean exit ends supervision.
    OnFailure,
    /// Restart after any exit.
    Always,
}

pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
    policy: RestartPolicy,
    initial_backoff_secs: u64,
    max_backoff_secs: u64,
    max_restarts: u32,
    mut run_component: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut backoff = initial_backoff_secs.max(1);
        let max_backoff = max_backoff_secs.max(backoff);
        let mut consecutive_failures: u32 = 0;

        loop {
            tracing::info!("Agent component '{name}' starting");
            match run_component().await {
                Ok(()) if policy == RestartPolicy::OnFailure => {
                    tracing::info!("Agent component '{name}' finished");
                    break;
                }
                Ok(()) => {
                    tracing::warn!("Agent component '{name}' exited unexpectedly");
                    backoff = initial_backoff_secs.max(1);
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
                Err(e) => {
                    tracing::error!("Agent component '{name}' failed: {e}");
                    consecutive_failures = consecutive_failures.saturating_add(1);
                }
            }

            if max_restarts > 0 && consecutive_failures > max_restarts {
                tracing::error!(
                    "Agent component '{name}' exceeded max restarts ({max_restarts}), circuit open"
                );
                break;
            }
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn restarts_on_failure_until_circuit_opens() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        let handle = spawn_component_supervisor(
            "supervisor-test-fail",
            RestartPolicy::OnFailure,
            1,
            4,
            3,
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    anyhow::bail!("boom")
                }
            },
        );

        handle.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn clean_exit_ends_on_failure_policy() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        let handle = spawn_component_supervisor(
            "supervisor-test-exit",
            RestartPolicy::OnFailure,
            1,
            1,
            0,
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        );

        handle.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn always_policy_restarts_after_exit() {
        let runs = Arc::new(AtomicU32::new(0));
        let counter = runs.clone();
        let handle = spawn_component_supervisor(
            "supervisor-test-always",
            RestartPolicy::Always,
            1,
            1,
            2,
            move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        );

        handle.await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }
}
