//! One unit of work: fetch all coordinates, transform, publish one batch.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use weather_common::{Coordinate, Units, WeatherResult};

use crate::observer::{RunObserver, Step};
use crate::publish::{BatchPublisher, PublishOutcome};
use crate::source::ObservationSource;
use crate::transform::transform;

/// Default job name reported to observers.
pub const JOB_NAME: &str = "weather_product_job";

/// Summary of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub observations: usize,
    pub records: usize,
    pub outcome: PublishOutcome,
    pub duration: Duration,
}

/// The collection pipeline.
///
/// Stages run strictly in sequence. A failing stage ends the run; later
/// stages never execute and nothing is published.
pub struct Pipeline {
    job: String,
    source: Arc<dyn ObservationSource>,
    publisher: BatchPublisher,
    coordinates: Vec<Coordinate>,
    units: Units,
}

impl Pipeline {
    pub fn new(
        source: Arc<dyn ObservationSource>,
        publisher: BatchPublisher,
        coordinates: Vec<Coordinate>,
        units: Units,
    ) -> Self {
        Self {
            job: JOB_NAME.to_string(),
            source,
            publisher,
            coordinates,
            units,
        }
    }

    /// Override the job name used in events and metrics.
    pub fn with_job_name(mut self, job: impl Into<String>) -> Self {
        self.job = job.into();
        self
    }

    /// Execute one invocation.
    #[instrument(skip(self, observer), fields(job = %self.job, coordinates = self.coordinates.len()))]
    pub async fn run(&self, observer: &dyn RunObserver) -> WeatherResult<RunReport> {
        let started = Instant::now();
        observer.job_started(&self.job);

        match self.run_steps(observer).await {
            Ok((observations, records, outcome)) => {
                let duration = started.elapsed();
                observer.job_succeeded(&self.job, duration);
                info!(
                    observations,
                    records,
                    location = outcome.location().unwrap_or("<nothing written>"),
                    "Pipeline run complete"
                );
                Ok(RunReport {
                    observations,
                    records,
                    outcome,
                    duration,
                })
            }
            Err(e) => {
                observer.job_failed(&self.job, started.elapsed(), &e);
                Err(e)
            }
        }
    }

    async fn run_steps(
        &self,
        observer: &dyn RunObserver,
    ) -> WeatherResult<(usize, usize, PublishOutcome)> {
        let raw = self
            .step(observer, Step::Fetch, async {
                self.source.fetch(&self.coordinates, self.units).await
            })
            .await?;

        let records = self
            .step(observer, Step::Transform, async { transform(&raw) })
            .await?;

        let outcome = self
            .step(observer, Step::Publish, self.publisher.publish(&records))
            .await?;

        Ok((raw.len(), records.len(), outcome))
    }

    async fn step<T, F>(&self, observer: &dyn RunObserver, step: Step, work: F) -> WeatherResult<T>
    where
        F: Future<Output = WeatherResult<T>>,
    {
        let started = Instant::now();
        observer.step_started(&self.job, step);

        let result = work.await;
        match &result {
            Ok(_) => observer.step_succeeded(&self.job, step, started.elapsed()),
            Err(e) => observer.step_failed(&self.job, step, e),
        }
        result
    }
}
