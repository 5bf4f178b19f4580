//! Shared application state.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use storage::{ObjectStorage, StoragePath};

/// State shared by every request. Nothing in it is mutated after startup.
pub struct AppState {
    pub storage: Arc<ObjectStorage>,
    /// Key prefix the batches are published under
    pub prefix: String,
    /// Handle of the installed Prometheus recorder, if any
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(storage: Arc<ObjectStorage>, prefix: &str) -> Self {
        Self {
            storage,
            prefix: StoragePath::normalize_prefix(prefix).to_string(),
            prometheus: None,
        }
    }

    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }
}
