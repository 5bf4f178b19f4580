//! HTTP handlers for the products API.
//!
//! Provides endpoints for:
//! - `GET /products` - Records from the most recent batches
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use crate::listing::latest_records;
use crate::state::AppState;

// ============================================================================
// Query Parameters
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    /// Number of most recent batches to read
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    1
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

// ============================================================================
// Router
// ============================================================================

/// Build the HTTP router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/products", get(products_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(Extension(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /products - Records from the `limit` most recent batches
async fn products_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(query): Query<ProductsQuery>,
) -> Response {
    counter!("products_requests_total").increment(1);

    match latest_records(&state.storage, &state.prefix, query.limit).await {
        Ok(records) => {
            info!(limit = query.limit, records = records.len(), "Served products");
            histogram!("products_records_returned").record(records.len() as f64);
            Json(records).into_response()
        }
        Err(e) => {
            error!(limit = query.limit, error = %e, "Failed to list products");
            counter!("products_request_errors_total", "error" => e.kind()).increment(1);
            let status = StatusCode::from_u16(e.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
        }
    }
}

/// GET /health - Health check
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "products-api".to_string(),
    })
}

/// GET /metrics - Prometheus metrics
async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::OK, String::new()),
    }
}
