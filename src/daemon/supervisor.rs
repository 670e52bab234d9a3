use anyhow::Result;
use std::future::Future;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Duration;

/// Keep restarting `run_component` with exponential backoff. Each start runs
/// in its own task, so a panic counts as a failed run instead of taking the
/// supervisor down. After more than `max_restarts` consecutive exits the
/// component is given up on; `0` means restart forever.
pub(super) fn spawn_component_supervisor<F, Fut>(
    name: &'static str,
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
            tracing::info!(component = name, "starting");
            // Dropping the set aborts the run when the supervisor is aborted.
            let mut running = JoinSet::new();
            running.spawn(run_component());
            match running.join_next().await {
                Some(Ok(Ok(()))) | None => {
                    tracing::warn!(component = name, "exited unexpectedly");
                    backoff = initial_backoff_secs.max(1);
                }
                Some(Ok(Err(e))) => {
                    tracing::error!(component = name, "failed: {e:#}");
                }
                Some(Err(e)) => {
                    tracing::error!(component = name, "panicked: {e}");
                }
            }
            consecutive_failures = consecutive_failures.saturating_add(1);

            if max_restarts > 0 && consecutive_failures > max_restarts {
                tracing::error!(
                    component = name,
                    "exceeded {max_restarts} restarts, giving up"
                );
                break;
            }
            tokio::time::sleep(Duration::from_secs(backoff)).await;
            backoff = backoff.saturating_mul(2).min(max_backoff);
        }
    })
}
