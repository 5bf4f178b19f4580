//! Observation points around pipeline runs.
//!
//! The pipeline reports job and step lifecycle events to a [`RunObserver`].
//! [`MetricsObserver`] turns them into Prometheus-style metrics through the
//! `metrics` facade; the recorder itself is installed by the binary.

use std::fmt;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use tracing::{error, info};

use weather_common::WeatherError;

/// A stage of the collection pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Fetch,
    Transform,
    Publish,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Fetch => "fetch_weather",
            Step::Transform => "transform_weather",
            Step::Publish => "publish_batch",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives job and step lifecycle events. All methods default to no-ops.
pub trait RunObserver: Send + Sync {
    fn job_started(&self, _job: &str) {}
    fn job_succeeded(&self, _job: &str, _duration: Duration) {}
    fn job_failed(&self, _job: &str, _duration: Duration, _error: &WeatherError) {}
    fn step_started(&self, _job: &str, _step: Step) {}
    fn step_succeeded(&self, _job: &str, _step: Step, _duration: Duration) {}
    fn step_failed(&self, _job: &str, _step: Step, _error: &WeatherError) {}
}

/// Observer that ignores every event.
impl RunObserver for () {}

/// Records job/step counters, a running gauge and a duration histogram.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsObserver;

impl RunObserver for MetricsObserver {
    fn job_started(&self, job: &str) {
        counter!("weather_job_total", "job" => job.to_string()).increment(1);
        gauge!("weather_jobs_running").increment(1.0);
    }

    fn job_succeeded(&self, job: &str, duration: Duration) {
        counter!("weather_job_success_total", "job" => job.to_string()).increment(1);
        histogram!("weather_run_duration_seconds", "job" => job.to_string())
            .record(duration.as_secs_f64());
        gauge!("weather_jobs_running").decrement(1.0);
        info!(job, duration_ms = duration.as_millis() as u64, "Job completed successfully");
    }

    fn job_failed(&self, job: &str, duration: Duration, err: &WeatherError) {
        counter!(
            "weather_job_failure_total",
            "job" => job.to_string(),
            "error" => err.kind()
        )
        .increment(1);
        histogram!("weather_run_duration_seconds", "job" => job.to_string())
            .record(duration.as_secs_f64());
        gauge!("weather_jobs_running").decrement(1.0);
        error!(job, error = %err, duration_ms = duration.as_millis() as u64, "Job failed");
    }

    fn step_started(&self, job: &str, step: Step) {
        counter!("weather_step_total", "job" => job.to_string(), "step" => step.as_str())
            .increment(1);
    }

    fn step_succeeded(&self, job: &str, step: Step, _duration: Duration) {
        counter!("weather_step_success_total", "job" => job.to_string(), "step" => step.as_str())
            .increment(1);
    }

    fn step_failed(&self, job: &str, step: Step, _error: &WeatherError) {
        counter!("weather_step_failure_total", "job" => job.to_string(), "step" => step.as_str())
            .increment(1);
    }
}
