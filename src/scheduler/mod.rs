//! Self-re-arming background sweeps over every linked session.

mod judge;
mod refresh;

pub use judge::{JudgeOutcome, judge_session, judge_sweep, judge_sweep_at};
pub use refresh::{refresh_credentials, refresh_sweep, refresh_sweep_at};

use crate::config::Config;
use crate::http::build_http_client_with_timeout;
use crate::session::SessionStore;
use crate::social::SocialClient;
use anyhow::Result;
use rand::seq::IndexedRandom;
use reqwest::Client;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const FALLBACK_DELAY: Duration = Duration::from_secs(5);

/// Shared handles every sweep works with.
#[derive(Debug, Clone)]
pub struct SweepContext {
    pub config: Arc<Config>,
    pub store: SessionStore,
    pub social: SocialClient,
    pub http: Client,
}

impl SweepContext {
    pub fn new(config: Arc<Config>) -> Self {
        let store = SessionStore::from_config(&config);
        let http = build_http_client_with_timeout(config.http_timeout_secs);
        Self::with_parts(config, store, http)
    }

    pub fn with_parts(config: Arc<Config>, store: SessionStore, http: Client) -> Self {
        Self {
            social: SocialClient::new(http.clone()),
            config,
            store,
            http,
        }
    }
}

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Sessions the sweep did work for.
    pub processed: usize,
    /// Sessions whose cycle failed (judge sweep only; refresh stops instead).
    pub failed: usize,
    /// Sessions that were not due or not configured.
    pub skipped: usize,
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} processed, {} failed, {} skipped",
            self.processed, self.failed, self.skipped
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TaskPhase {
    /// Timer armed, waiting for the next run.
    Idle,
    /// A sweep is in progress.
    Running,
}

/// A sweep that runs, waits a randomly drawn delay, and runs again.
///
/// The next delay is drawn only after the previous sweep has returned, so
/// at most one sweep of a task is ever in flight.
pub struct PeriodicTask {
    name: &'static str,
    heartbeats: Vec<Duration>,
    phase: watch::Sender<TaskPhase>,
}

impl PeriodicTask {
    pub fn new(name: &'static str, heartbeats: Vec<Duration>) -> Self {
        let (phase, _) = watch::channel(TaskPhase::Idle);
        Self {
            name,
            heartbeats,
            phase,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn phase(&self) -> TaskPhase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskPhase> {
        self.phase.subscribe()
    }

    pub fn next_delay(&self) -> Duration {
        self.heartbeats
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(FALLBACK_DELAY)
    }

    /// Run `sweep` forever. Sweep errors are logged and do not stop the
    /// loop.
    pub async fn run<F, Fut>(&self, mut sweep: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<SweepReport>>,
    {
        loop {
            let delay = self.next_delay();
            tracing::debug!(task = self.name, ?delay, "timer armed");
            tokio::time::sleep(delay).await;

            self.phase.send_replace(TaskPhase::Running);
            tracing::info!(task = self.name, "sweep started");
            match sweep().await {
                Ok(report) => tracing::info!(task = self.name, %report, "sweep finished"),
                Err(error) => tracing::error!(task = self.name, "sweep aborted: {error:#}"),
            }
            self.phase.send_replace(TaskPhase::Idle);
        }
    }
}
