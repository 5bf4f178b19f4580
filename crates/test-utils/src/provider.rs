//! In-process mock of the weather provider's current-conditions endpoint.
//!
//! Responses are keyed by the `lat` query parameter. Every request is
//! recorded with its query and arrival time so tests can check ordering,
//! parameters and pacing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use weather_common::Coordinate;

/// Path the mock serves on.
pub const WEATHER_PATH: &str = "/data/2.5/weather";

/// What the mock answers for one coordinate.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// 200 with the given body
    Json(Value),
    /// Non-success status with a provider-style error body
    Status(u16, String),
    /// 200 with the given body after a delay
    Delayed(Duration, Value),
}

/// A request observed by the mock.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub query: HashMap<String, String>,
    pub received_at: Instant,
}

struct MockState {
    responses: HashMap<String, MockResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A running mock provider bound to a random local port.
pub struct MockProvider {
    addr: SocketAddr,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockProvider {
    /// Start a mock answering each `(coordinate, response)` pair.
    pub async fn start(responses: Vec<(Coordinate, MockResponse)>) -> Self {
        let state = Arc::new(MockState {
            responses: responses
                .into_iter()
                .map(|(coord, response)| (coord.lat.to_string(), response))
                .collect(),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(WEATHER_PATH, get(weather_handler))
            .layer(Extension(state.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock provider");
        let addr = listener.local_addr().expect("mock provider address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Start a mock answering every coordinate with its canned fixture.
    pub async fn with_fixtures(coordinates: &[Coordinate]) -> Self {
        let responses = coordinates
            .iter()
            .map(|c| (c.clone(), MockResponse::Json(crate::fixtures::response_for(c))))
            .collect();
        Self::start(responses).await
    }

    /// URL to use as the provider base URL.
    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, WEATHER_PATH)
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn weather_handler(
    Extension(state): Extension<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let lat = query.get("lat").cloned().unwrap_or_default();
    state
        .requests
        .lock()
        .expect("requests lock")
        .push(RecordedRequest {
            query,
            received_at: Instant::now(),
        });

    match state.responses.get(&lat) {
        Some(MockResponse::Json(body)) => Json(body.clone()).into_response(),
        Some(MockResponse::Delayed(delay, body)) => {
            tokio::time::sleep(*delay).await;
            Json(body.clone()).into_response()
        }
        Some(MockResponse::Status(code, message)) => {
            let status = StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({"cod": code, "message": message}))).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"cod": "404", "message": "city not found"})),
        )
            .into_response(),
    }
}
