//! Tests for the collector scheduler and status API.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use object_store::memory::InMemory;
use serde_json::Value;
use tower::ServiceExt;

use collection::{BatchPublisher, OpenWeatherClient, Pipeline, PublishOutcome, SourceConfig};
use collector::scheduler::{Scheduler, Trigger};
use collector::server::{build_router, ServerState};
use storage::ObjectStorage;
use test_utils::{fixtures, MockProvider, MockResponse};
use weather_common::{decode_batch, Coordinate, NormalizedRecord, Units, WeatherError};

const PREFIX: &str = "weather-products/";

fn memory_storage() -> Arc<ObjectStorage> {
    Arc::new(ObjectStorage::with_store(
        Arc::new(InMemory::new()),
        "dagster-weather-products",
    ))
}

fn scheduler_for(
    mock: &MockProvider,
    storage: Arc<ObjectStorage>,
    coordinates: Vec<Coordinate>,
) -> Arc<Scheduler> {
    let mut config = SourceConfig::new("test-key");
    config.base_url = mock.url();
    config.request_delay = Duration::ZERO;
    let source = Arc::new(OpenWeatherClient::new(config).unwrap());
    let publisher = BatchPublisher::new(storage, PREFIX);
    let pipeline = Pipeline::new(source, publisher, coordinates, Units::Metric);
    Arc::new(Scheduler::new(pipeline, Arc::new(()), Duration::from_secs(3600)))
}

fn app(scheduler: Arc<Scheduler>) -> Router {
    build_router(Arc::new(ServerState {
        scheduler,
        prometheus: None,
    }))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_run_once_publishes_and_records() {
    let coords = fixtures::coordinates();
    let mock = MockProvider::with_fixtures(&coords).await;
    let storage = memory_storage();
    let scheduler = scheduler_for(&mock, storage.clone(), coords);

    let report = scheduler.run_once(Trigger::Scheduled).await.unwrap();

    assert_eq!(report.records, 2);
    let PublishOutcome::Written { key, .. } = &report.outcome else {
        panic!("expected a written batch, got {:?}", report.outcome);
    };
    let body = storage.get(key).await.unwrap();
    let records: Vec<NormalizedRecord> = decode_batch(key, &body).unwrap();
    assert_eq!(records.len(), 2);

    let status = scheduler.tracker().get_status().await;
    assert!(status.active.is_none());
    assert_eq!(status.total_completed, 1);
    assert_eq!(status.total_failed, 0);
    let run = &status.recent[0];
    assert!(run.success);
    assert_eq!(run.trigger, Trigger::Scheduled);
    assert_eq!(run.records, 2);
    assert_eq!(run.location.as_deref(), report.outcome.location());
}

#[tokio::test]
async fn test_failed_run_is_recorded() {
    let coords = fixtures::coordinates();
    let mock = MockProvider::start(vec![
        (coords[0].clone(), MockResponse::Json(fixtures::luxembourg_response())),
        (
            coords[1].clone(),
            MockResponse::Status(401, "Invalid API key".to_string()),
        ),
    ])
    .await;
    let storage = memory_storage();
    let scheduler = scheduler_for(&mock, storage.clone(), coords);

    let err = scheduler.run_once(Trigger::Manual).await.unwrap_err();
    assert!(matches!(err, WeatherError::Provider { status: Some(401), .. }));
    assert!(storage.list(PREFIX).await.unwrap().is_empty());

    let status = scheduler.tracker().get_status().await;
    assert_eq!(status.total_completed, 1);
    assert_eq!(status.total_failed, 1);
    let run = &status.recent[0];
    assert!(!run.success);
    assert_eq!(run.trigger, Trigger::Manual);
    assert!(run.location.is_none());
    assert!(run.error_message.is_some());
}

#[tokio::test]
async fn test_post_run_then_status() {
    let coords = fixtures::coordinates();
    let mock = MockProvider::with_fixtures(&coords).await;
    let scheduler = scheduler_for(&mock, memory_storage(), coords);

    let (status, body) = send(app(scheduler.clone()), post("/run")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["records"], 2);
    let location = body["location"].as_str().unwrap();
    assert!(location.starts_with("s3://dagster-weather-products/weather-products/"));
    assert!(location.ends_with(".jsonl"));

    let (status, body) = send(app(scheduler), get("/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["active"].is_null());
    assert_eq!(body["total_completed"], 1);
    assert_eq!(body["recent"][0]["trigger"], "manual");
    assert_eq!(body["recent"][0]["location"], location);
}

#[tokio::test]
async fn test_post_run_reports_provider_failure() {
    let coords = vec![Coordinate::new("Luxembourg", 49.6116, 6.1319)];
    let mock = MockProvider::start(vec![(
        coords[0].clone(),
        MockResponse::Status(500, "upstream down".to_string()),
    )])
    .await;
    let scheduler = scheduler_for(&mock, memory_storage(), coords);

    let (status, body) = send(app(scheduler), post("/run")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert!(body["location"].is_null());
}

#[tokio::test]
async fn test_run_with_no_coordinates_publishes_nothing() {
    let mock = MockProvider::start(Vec::new()).await;
    let storage = memory_storage();
    let scheduler = scheduler_for(&mock, storage.clone(), Vec::new());

    let (status, body) = send(app(scheduler), post("/run")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["records"], 0);
    assert!(body["location"].is_null());
    assert!(mock.requests().is_empty());
    assert!(storage.list(PREFIX).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_health() {
    let mock = MockProvider::start(Vec::new()).await;
    let scheduler = scheduler_for(&mock, memory_storage(), Vec::new());

    let (status, body) = send(app(scheduler), get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "collector");
}
