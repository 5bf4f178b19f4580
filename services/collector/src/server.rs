//! HTTP status server for the collector.
//!
//! Provides endpoints for:
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics
//! - `GET /status` - Active and recent runs
//! - `POST /run` - Trigger a run now

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use collection::{PublishOutcome, RunReport};
use weather_common::WeatherResult;

use crate::scheduler::{Scheduler, Trigger};

// ============================================================================
// Run tracking
// ============================================================================

/// A run in progress.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveRun {
    pub id: u64,
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
}

/// A finished run.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedRun {
    pub id: u64,
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub success: bool,
    pub records: usize,
    pub location: Option<String>,
    pub error_message: Option<String>,
}

/// Tracking for pipeline runs.
pub struct RunTracker {
    next_id: AtomicU64,
    active: Mutex<Option<ActiveRun>>,
    completed: Mutex<VecDeque<CompletedRun>>,
    max_completed: usize,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            active: Mutex::new(None),
            completed: Mutex::new(VecDeque::new()),
            max_completed: 100,
        }
    }

    pub async fn start(&self, trigger: Trigger) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *self.active.lock().await = Some(ActiveRun {
            id,
            trigger,
            started_at: Utc::now(),
        });
        id
    }

    pub async fn complete(&self, id: u64, result: &WeatherResult<RunReport>) {
        let run = {
            let mut active = self.active.lock().await;
            match active.take() {
                Some(run) if run.id == id => run,
                other => {
                    *active = other;
                    return;
                }
            }
        };

        let completed_at = Utc::now();
        let duration_ms = (completed_at - run.started_at).num_milliseconds().max(0) as u64;
        let (success, records, location, error_message) = match result {
            Ok(report) => (
                true,
                report.records,
                report.outcome.location().map(str::to_string),
                None,
            ),
            Err(e) => (false, 0, None, Some(e.to_string())),
        };

        let mut completed = self.completed.lock().await;
        completed.push_front(CompletedRun {
            id,
            trigger: run.trigger,
            started_at: run.started_at,
            completed_at,
            duration_ms,
            success,
            records,
            location,
            error_message,
        });

        // Keep only recent entries
        while completed.len() > self.max_completed {
            completed.pop_back();
        }
    }

    pub async fn get_status(&self) -> StatusResponse {
        let active = self.active.lock().await;
        let completed = self.completed.lock().await;

        StatusResponse {
            active: active.clone(),
            recent: completed.iter().take(20).cloned().collect(),
            total_completed: completed.len(),
            total_failed: completed.iter().filter(|r| !r.success).count(),
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Response for /status endpoint.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub active: Option<ActiveRun>,
    pub recent: Vec<CompletedRun>,
    pub total_completed: usize,
    pub total_failed: usize,
}

/// Response for /run endpoint.
#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub success: bool,
    pub message: String,
    pub records: usize,
    pub location: Option<String>,
}

impl From<&RunReport> for RunResponse {
    fn from(report: &RunReport) -> Self {
        let message = match &report.outcome {
            PublishOutcome::Written { .. } => format!("Published {} records", report.records),
            PublishOutcome::NothingWritten => "Nothing to publish".to_string(),
        };
        Self {
            success: true,
            message,
            records: report.records,
            location: report.outcome.location().map(str::to_string),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

// ============================================================================
// Shared State
// ============================================================================

pub struct ServerState {
    pub scheduler: Arc<Scheduler>,
    pub prometheus: Option<PrometheusHandle>,
}

// ============================================================================
// Router
// ============================================================================

/// Build the HTTP router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .route("/run", post(run_handler))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

/// Start the HTTP server.
pub async fn start_server(state: Arc<ServerState>, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port = port, "Starting collector status server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "collector".to_string(),
    })
}

/// GET /metrics - Prometheus metrics
async fn metrics_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    match &state.prometheus {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::OK, String::new()),
    }
}

/// GET /status - Active and recent runs
async fn status_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    Json(state.scheduler.tracker().get_status().await)
}

/// POST /run - Trigger a run and wait for its outcome
async fn run_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    info!("Received on-demand run request");

    match state.scheduler.run_once(Trigger::Manual).await {
        Ok(report) => (StatusCode::OK, Json(RunResponse::from(&report))),
        Err(e) => {
            error!(error = %e, "On-demand run failed");
            let status = StatusCode::from_u16(e.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            let response = RunResponse {
                success: false,
                message: format!("Run failed: {}", e),
                records: 0,
                location: None,
            };
            (status, Json(response))
        }
    }
}
