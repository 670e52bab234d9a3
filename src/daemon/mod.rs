use crate::config::Config;
use crate::scheduler::{PeriodicTask, SweepContext, judge_sweep, refresh_sweep};
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinHandle;

mod supervisor;

use supervisor::spawn_component_supervisor;

const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

/// Run both sweeps until Ctrl-C.
pub async fn run(config: Arc<Config>) -> Result<()> {
    let ctx = SweepContext::new(Arc::clone(&config));
    let handles = spawn_sweeps(&ctx);

    tracing::info!(
        sessions = %ctx.store.root().display(),
        judge_frequency_secs = config.judge_frequency_secs,
        social_session_age_secs = config.social_session_age_secs,
        "daemon started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    for handle in &handles {
        handle.abort();
    }
    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}

fn spawn_sweeps(ctx: &SweepContext) -> Vec<JoinHandle<()>> {
    let heartbeats = ctx.config.heartbeats();
    let mut handles = Vec::with_capacity(2);

    let refresh_ctx = ctx.clone();
    let refresh_beats = heartbeats.clone();
    handles.push(spawn_component_supervisor(
        "refresh",
        INITIAL_BACKOFF_SECS,
        MAX_BACKOFF_SECS,
        0,
        move || {
            let ctx = refresh_ctx.clone();
            let task = PeriodicTask::new("refresh", refresh_beats.clone());
            async move { task.run(|| refresh_sweep(&ctx)).await }
        },
    ));

    let judge_ctx = ctx.clone();
    handles.push(spawn_component_supervisor(
        "judge",
        INITIAL_BACKOFF_SECS,
        MAX_BACKOFF_SECS,
        0,
        move || {
            let ctx = judge_ctx.clone();
            let task = PeriodicTask::new("judge", heartbeats.clone());
            async move { task.run(|| judge_sweep(&ctx)).await }
        },
    ));

    handles
}
