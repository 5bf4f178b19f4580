//! Tests for the provider source adapter against the in-process mock provider.

use std::time::{Duration, Instant};

use collection::{ObservationSource, OpenWeatherClient, SourceConfig};
use test_utils::{assert_approx_eq, fixtures, MockProvider, MockResponse};
use weather_common::{Coordinate, Units, WeatherError};

fn client_for(mock: &MockProvider, delay: Duration) -> OpenWeatherClient {
    let mut config = SourceConfig::new("test-key");
    config.base_url = mock.url();
    config.request_delay = delay;
    OpenWeatherClient::new(config).unwrap()
}

#[tokio::test]
async fn test_fetch_preserves_order_and_attaches_meta() {
    let coords = fixtures::coordinates();
    let mock = MockProvider::with_fixtures(&coords).await;
    let client = client_for(&mock, Duration::ZERO);

    let raw = client.fetch(&coords, Units::Metric).await.unwrap();

    assert_eq!(raw.len(), 2);
    assert_eq!(raw[0].meta.requested_name.as_deref(), Some("Luxembourg"));
    assert_eq!(raw[1].meta.requested_name.as_deref(), Some("Chicago"));
    assert_approx_eq!(raw[1].meta.requested_lat, 41.8781, 1e-9);
    assert_eq!(raw[0].body["name"], "Luxembourg City");
    assert_eq!(raw[1].body["name"], "Chicago");
}

#[tokio::test]
async fn test_fetch_sends_expected_query() {
    let coords = fixtures::coordinates();
    let mock = MockProvider::with_fixtures(&coords).await;
    let client = client_for(&mock, Duration::ZERO);

    client.fetch(&coords, Units::Metric).await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    let first = &requests[0].query;
    assert_eq!(first.get("lat").map(String::as_str), Some("49.6116"));
    assert_eq!(first.get("lon").map(String::as_str), Some("6.1319"));
    assert_eq!(first.get("appid").map(String::as_str), Some("test-key"));
    assert_eq!(first.get("units").map(String::as_str), Some("metric"));
    assert_eq!(requests[1].query.get("lat").map(String::as_str), Some("41.8781"));
}

#[tokio::test]
async fn test_standard_units_omit_parameter() {
    let coords = vec![Coordinate::new("Luxembourg", 49.6116, 6.1319)];
    let mock = MockProvider::with_fixtures(&coords).await;
    let client = client_for(&mock, Duration::ZERO);

    client.fetch(&coords, Units::Standard).await.unwrap();

    assert!(!mock.requests()[0].query.contains_key("units"));
}

#[tokio::test]
async fn test_non_success_fails_whole_fetch() {
    let coords = vec![
        Coordinate::new("Luxembourg", 49.6116, 6.1319),
        Coordinate::new("Nowhere", 10.5, 10.5),
        Coordinate::new("Chicago", 41.8781, -87.6298),
    ];
    let mock = MockProvider::start(vec![
        (coords[0].clone(), MockResponse::Json(fixtures::luxembourg_response())),
        (coords[1].clone(), MockResponse::Status(401, "Invalid API key".to_string())),
        (coords[2].clone(), MockResponse::Json(fixtures::chicago_response())),
    ])
    .await;
    let client = client_for(&mock, Duration::ZERO);

    let err = client.fetch(&coords, Units::Metric).await.unwrap_err();

    match err {
        WeatherError::Provider {
            coordinate,
            status,
            message,
        } => {
            assert!(coordinate.starts_with("Nowhere"));
            assert_eq!(status, Some(401));
            assert!(message.contains("Invalid API key"));
        }
        other => panic!("unexpected error: {other}"),
    }
    // The third coordinate is never requested.
    assert_eq!(mock.requests().len(), 2);
}

#[tokio::test]
async fn test_timeout_is_provider_error() {
    let coords = vec![Coordinate::new("Slow", 12.5, 12.5)];
    let mock = MockProvider::start(vec![(
        coords[0].clone(),
        MockResponse::Delayed(Duration::from_secs(3), fixtures::luxembourg_response()),
    )])
    .await;

    let mut config = SourceConfig::new("test-key");
    config.base_url = mock.url();
    config.request_timeout = Duration::from_millis(200);
    let client = OpenWeatherClient::new(config).unwrap();

    let err = client.fetch(&coords, Units::Metric).await.unwrap_err();
    match err {
        WeatherError::Provider { status, message, .. } => {
            assert_eq!(status, None);
            assert!(message.contains("timed out"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_delay_between_requests_only() {
    let coords = fixtures::coordinates();
    let mock = MockProvider::with_fixtures(&coords).await;
    let delay = Duration::from_millis(300);
    let client = client_for(&mock, delay);

    client.fetch(&coords, Units::Metric).await.unwrap();
    let requests = mock.requests();
    let gap = requests[1].received_at.duration_since(requests[0].received_at);
    assert!(gap >= delay, "gap {:?} shorter than delay", gap);

    // No trailing delay after the last coordinate.
    let single = &coords[..1];
    let started = Instant::now();
    client.fetch(single, Units::Metric).await.unwrap();
    assert!(started.elapsed() < delay);
}
