//! Storage abstractions for the weather products services.
//!
//! Provides a thin, write-once interface over S3-compatible object storage
//! and the key layout used for batch objects.

pub mod object_store;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig, StoragePath, BATCH_SUFFIX};
