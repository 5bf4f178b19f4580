//! Run scheduling for the collection pipeline.
//!
//! Scheduled runs fire at the next multiple of the interval (the top of the
//! hour for the default one-hour interval). Scheduled and on-demand runs
//! share one lock so invocations never overlap against the same prefix.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, instrument};

use collection::{Pipeline, RunObserver, RunReport};
use weather_common::WeatherResult;

use crate::server::RunTracker;

/// What caused a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Scheduled,
    Manual,
}

/// Next interval boundary strictly after `now`.
///
/// A boundary past the representable range means the run never fires.
pub fn next_run_after(now: DateTime<Utc>, interval: Duration) -> DateTime<Utc> {
    let interval = i64::try_from(interval.as_secs().max(1)).unwrap_or(i64::MAX);
    (now.timestamp().div_euclid(interval) + 1)
        .checked_mul(interval)
        .and_then(|next| Utc.timestamp_opt(next, 0).single())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Drives the pipeline on a fixed interval and on demand.
pub struct Scheduler {
    pipeline: Pipeline,
    observer: Arc<dyn RunObserver>,
    tracker: RunTracker,
    interval: Duration,
    run_lock: Mutex<()>,
}

impl Scheduler {
    pub fn new(pipeline: Pipeline, observer: Arc<dyn RunObserver>, interval: Duration) -> Self {
        Self {
            pipeline,
            observer,
            tracker: RunTracker::new(),
            interval,
            run_lock: Mutex::new(()),
        }
    }

    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    /// Run the pipeline once, waiting for any in-flight run to finish first.
    #[instrument(skip(self))]
    pub async fn run_once(&self, trigger: Trigger) -> WeatherResult<RunReport> {
        let _guard = self.run_lock.lock().await;

        let id = self.tracker.start(trigger).await;
        let result = self.pipeline.run(self.observer.as_ref()).await;
        self.tracker.complete(id, &result).await;

        result
    }

    /// Run on every interval boundary until shutdown is signalled.
    pub async fn run_forever(&self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.interval);
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next_run = %next.to_rfc3339(), "Waiting for next scheduled run");

            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Shutting down scheduler");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            if let Err(e) = self.run_once(Trigger::Scheduled).await {
                error!(error = %e, "Scheduled run failed");
            }
        }
    }
}
