//! Batch publisher: one immutable NDJSON object per pipeline run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use storage::{ObjectStorage, StoragePath};
use weather_common::{encode_batch, NormalizedRecord, WeatherError, WeatherResult};

/// Result of a publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A new batch object was created.
    Written {
        /// Fully-qualified location, e.g. `s3://bucket/prefix/2024/01/15/120000.jsonl`
        location: String,
        key: String,
        records: usize,
        bytes: usize,
    },
    /// The batch was empty; no object was created.
    NothingWritten,
}

impl PublishOutcome {
    pub fn location(&self) -> Option<&str> {
        match self {
            PublishOutcome::Written { location, .. } => Some(location),
            PublishOutcome::NothingWritten => None,
        }
    }
}

/// Writes batches under a time-partitioned key prefix.
pub struct BatchPublisher {
    storage: Arc<ObjectStorage>,
    prefix: String,
}

impl BatchPublisher {
    pub fn new(storage: Arc<ObjectStorage>, prefix: &str) -> Self {
        Self {
            storage,
            prefix: StoragePath::normalize_prefix(prefix).to_string(),
        }
    }

    /// Publish a batch keyed by the current UTC time.
    pub async fn publish(&self, records: &[NormalizedRecord]) -> WeatherResult<PublishOutcome> {
        self.publish_at(records, Utc::now()).await
    }

    /// Publish a batch keyed by `at`.
    ///
    /// An existing object at the same key is never replaced; the call fails
    /// with [`WeatherError::KeyCollision`] instead.
    #[instrument(skip(self, records), fields(prefix = %self.prefix, records = records.len()))]
    pub async fn publish_at(
        &self,
        records: &[NormalizedRecord],
        at: DateTime<Utc>,
    ) -> WeatherResult<PublishOutcome> {
        if records.is_empty() {
            info!("Empty batch, nothing to publish");
            return Ok(PublishOutcome::NothingWritten);
        }

        let key = StoragePath::batch(&self.prefix, at);
        let body = encode_batch(records).map_err(|e| WeatherError::Publish {
            key: key.clone(),
            message: format!("serialization failed: {}", e),
        })?;
        let bytes = body.len();

        self.storage
            .put_new(&key, body)
            .await
            .map_err(|e| match e {
                WeatherError::KeyCollision(_) => e,
                other => WeatherError::Publish {
                    key: key.clone(),
                    message: other.to_string(),
                },
            })?;

        let location = self.storage.location(&key);
        info!(location = %location, bytes, "Published batch");

        Ok(PublishOutcome::Written {
            location,
            key,
            records: records.len(),
            bytes,
        })
    }
}
