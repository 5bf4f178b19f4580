//! Object storage interface for batch objects (S3 compatible).

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::{
    aws::{AmazonS3Builder, S3ConditionalPut},
    path::Path,
    ClientOptions, ObjectStore, PutMode, PutOptions,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use weather_common::{WeatherError, WeatherResult};

/// Suffix carried by every batch object.
pub const BATCH_SUFFIX: &str = ".jsonl";

/// Configuration for object storage connection.
///
/// Credentials are taken from the standard AWS environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// Bucket name
    pub bucket: String,
    /// Custom endpoint URL (MinIO, LocalStack); AWS when unset
    pub endpoint: Option<String>,
    /// AWS region
    pub region: Option<String>,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
    /// Use `If-None-Match` conditional puts for create-only writes
    pub conditional_put: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            bucket: "dagster-weather-products".to_string(),
            endpoint: None,
            region: None,
            allow_http: false,
            conditional_put: false,
        }
    }
}

/// Object storage client for batch objects.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> WeatherResult<Self> {
        let client_options = ClientOptions::new()
            .with_content_type_for_suffix("jsonl", "application/json");

        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&config.bucket)
            .with_client_options(client_options);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(region) = &config.region {
            builder = builder.with_region(region);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }
        if config.conditional_put {
            builder = builder.with_conditional_put(S3ConditionalPut::ETagMatch);
        }

        let store = builder.build().map_err(|e| {
            WeatherError::StorageAccess(format!("Failed to create S3 client: {}", e))
        })?;

        Ok(Self::with_store(Arc::new(store), &config.bucket))
    }

    /// Wrap an existing store, e.g. `InMemory` in tests.
    pub fn with_store(store: Arc<dyn ObjectStore>, bucket: &str) -> Self {
        Self {
            store,
            bucket: bucket.to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Fully-qualified location of a key.
    pub fn location(&self, path: &str) -> String {
        format!("s3://{}/{}", self.bucket, path)
    }

    /// Write bytes to a path that must not exist yet.
    ///
    /// Uses a create-only put. Stores without conditional write support fall
    /// back to a head check before the put.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put_new(&self, path: &str, data: Bytes) -> WeatherResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        let options = PutOptions {
            mode: PutMode::Create,
            ..Default::default()
        };

        match self.store.put_opts(&location, data.clone(), options).await {
            Ok(_) => Ok(()),
            Err(object_store::Error::AlreadyExists { .. }) => {
                Err(WeatherError::KeyCollision(path.to_string()))
            }
            Err(object_store::Error::NotImplemented) => {
                warn!("Store lacks conditional puts, checking existence first");
                if self.exists(path).await? {
                    return Err(WeatherError::KeyCollision(path.to_string()));
                }
                self.store.put(&location, data).await.map_err(|e| {
                    WeatherError::StorageAccess(format!("Failed to write {}: {}", path, e))
                })?;
                Ok(())
            }
            Err(e) => Err(WeatherError::StorageAccess(format!(
                "Failed to write {}: {}",
                path, e
            ))),
        }
    }

    /// Read bytes from a path.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn get(&self, path: &str) -> WeatherResult<Bytes> {
        let location = Path::from(path);

        let result = self
            .store
            .get(&location)
            .await
            .map_err(|e| WeatherError::StorageAccess(format!("Failed to read {}: {}", path, e)))?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| WeatherError::StorageAccess(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Check if an object exists.
    pub async fn exists(&self, path: &str) -> WeatherResult<bool> {
        let location = Path::from(path);

        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(WeatherError::StorageAccess(format!(
                "Failed to check {}: {}",
                path, e
            ))),
        }
    }

    /// List object keys with a given prefix.
    pub async fn list(&self, prefix: &str) -> WeatherResult<Vec<String>> {
        use futures::TryStreamExt;

        let prefix_path = Path::from(prefix);
        let mut paths = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| WeatherError::StorageAccess(format!("List failed: {}", e)))?
        {
            paths.push(meta.location.to_string());
        }

        Ok(paths)
    }
}

/// Path builder for consistent storage layout.
pub struct StoragePath;

impl StoragePath {
    /// Strip leading and trailing delimiters from a configured prefix.
    pub fn normalize_prefix(prefix: &str) -> &str {
        prefix.trim_matches('/')
    }

    /// Build the key for a batch collected at `at`.
    /// Format: {prefix}/{YYYY}/{MM}/{DD}/{HHMMSS}.jsonl
    pub fn batch(prefix: &str, at: DateTime<Utc>) -> String {
        let prefix = Self::normalize_prefix(prefix);
        let stamp = at.format("%Y/%m/%d/%H%M%S");
        if prefix.is_empty() {
            format!("{}{}", stamp, BATCH_SUFFIX)
        } else {
            format!("{}/{}{}", prefix, stamp, BATCH_SUFFIX)
        }
    }

    /// Whether a listed key is a batch object.
    pub fn is_batch(key: &str) -> bool {
        key.ends_with(BATCH_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use object_store::memory::InMemory;

    fn memory_storage() -> ObjectStorage {
        ObjectStorage::with_store(Arc::new(InMemory::new()), "test-bucket")
    }

    #[test]
    fn test_batch_paths() {
        let at = Utc.with_ymd_and_hms(2024, 1, 5, 9, 3, 7).unwrap();
        assert_eq!(
            StoragePath::batch("weather-products/", at),
            "weather-products/2024/01/05/090307.jsonl"
        );
        assert_eq!(
            StoragePath::batch("/weather-products", at),
            "weather-products/2024/01/05/090307.jsonl"
        );
        assert_eq!(StoragePath::batch("", at), "2024/01/05/090307.jsonl");
    }

    #[test]
    fn test_batch_paths_sort_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 9, 30, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        assert!(StoragePath::batch("p", earlier) < StoragePath::batch("p", later));
    }

    #[test]
    fn test_is_batch() {
        assert!(StoragePath::is_batch("p/2024/01/05/090307.jsonl"));
        assert!(!StoragePath::is_batch("p/2024/01/05/_manifest.json"));
    }

    #[tokio::test]
    async fn test_put_new_refuses_existing_key() {
        let storage = memory_storage();
        storage
            .put_new("p/a.jsonl", Bytes::from_static(b"first"))
            .await
            .unwrap();

        let err = storage
            .put_new("p/a.jsonl", Bytes::from_static(b"second"))
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::KeyCollision(ref k) if k == "p/a.jsonl"));

        let body = storage.get("p/a.jsonl").await.unwrap();
        assert_eq!(&body[..], b"first");
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let storage = memory_storage();
        for key in ["p/2024/01/01/000000.jsonl", "p/2024/01/02/000000.jsonl", "q/x.jsonl"] {
            storage.put_new(key, Bytes::from_static(b"{}")).await.unwrap();
        }

        let mut keys = storage.list("p").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["p/2024/01/01/000000.jsonl", "p/2024/01/02/000000.jsonl"]);
        assert!(storage.list("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_is_storage_error() {
        let storage = memory_storage();
        let err = storage.get("p/nope.jsonl").await.unwrap_err();
        assert!(matches!(err, WeatherError::StorageAccess(_)));
        assert!(!storage.exists("p/nope.jsonl").await.unwrap());
        assert_eq!(storage.location("p/k.jsonl"), "s3://test-bucket/p/k.jsonl");
    }
}
