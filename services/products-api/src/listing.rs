//! Selection and aggregation of the most recent batch objects.

use serde_json::Value;
use tracing::{debug, instrument};

use storage::{ObjectStorage, StoragePath};
use weather_common::{decode_batch, WeatherResult};

/// Keys of the `limit` most recent batch objects under `prefix`, oldest first.
///
/// Batch keys embed their UTC collection time, so lexical order is
/// chronological order.
pub async fn latest_batch_keys(
    storage: &ObjectStorage,
    prefix: &str,
    limit: usize,
) -> WeatherResult<Vec<String>> {
    let mut keys: Vec<String> = storage
        .list(StoragePath::normalize_prefix(prefix))
        .await?
        .into_iter()
        .filter(|key| StoragePath::is_batch(key))
        .collect();
    keys.sort();

    let skip = keys.len().saturating_sub(limit);
    Ok(keys.split_off(skip))
}

/// Records of the `limit` most recent batches, concatenated.
///
/// Line order inside each object is preserved. A malformed line fails the
/// whole call.
#[instrument(skip(storage), fields(bucket = %storage.bucket()))]
pub async fn latest_records(
    storage: &ObjectStorage,
    prefix: &str,
    limit: usize,
) -> WeatherResult<Vec<Value>> {
    let keys = latest_batch_keys(storage, prefix, limit).await?;

    let mut records = Vec::new();
    for key in &keys {
        let body = storage.get(key).await?;
        let batch: Vec<Value> = decode_batch(key, &body)?;
        debug!(key = %key, records = batch.len(), "Read batch");
        records.extend(batch);
    }

    Ok(records)
}
