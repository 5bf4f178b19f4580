//! Source adapter for the OpenWeatherMap current-conditions endpoint.
//!
//! Coordinates are fetched one at a time in configuration order, with a
//! short courtesy delay between requests. Any failure aborts the whole
//! fetch: callers either get one observation per coordinate or an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, instrument};

use weather_common::{Coordinate, Units, WeatherError, WeatherResult};

/// Current-conditions endpoint.
pub const OPENWEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Configuration for the provider client.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Endpoint URL (overridable for testing)
    pub base_url: String,
    /// Provider API key, sent as `appid`
    pub api_key: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Delay between consecutive coordinate requests
    pub request_delay: Duration,
}

impl SourceConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: OPENWEATHER_URL.to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(20),
            request_delay: Duration::from_millis(200),
        }
    }
}

/// Request context attached to every raw observation.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestMeta {
    pub requested_name: Option<String>,
    pub requested_lat: f64,
    pub requested_lon: f64,
}

impl From<&Coordinate> for RequestMeta {
    fn from(coord: &Coordinate) -> Self {
        Self {
            requested_name: coord.name.clone(),
            requested_lat: coord.lat,
            requested_lon: coord.lon,
        }
    }
}

/// Provider response annotated with the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    /// Unmodified provider response body
    pub body: Value,
    pub meta: RequestMeta,
}

impl RawObservation {
    pub fn new(body: Value, coord: &Coordinate) -> Self {
        Self {
            body,
            meta: RequestMeta::from(coord),
        }
    }
}

/// A provider of raw current-weather observations.
#[async_trait]
pub trait ObservationSource: Send + Sync {
    /// Fetch one observation per coordinate, in input order.
    async fn fetch(
        &self,
        coordinates: &[Coordinate],
        units: Units,
    ) -> WeatherResult<Vec<RawObservation>>;
}

/// HTTP client for the OpenWeatherMap API.
pub struct OpenWeatherClient {
    client: Client,
    config: SourceConfig,
}

impl OpenWeatherClient {
    /// Create a new client with the given configuration.
    pub fn new(config: SourceConfig) -> WeatherResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| WeatherError::InvalidConfig(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Fetch the current conditions for a single coordinate.
    #[instrument(skip(self), fields(coordinate = %coord))]
    pub async fn fetch_one(&self, coord: &Coordinate, units: Units) -> WeatherResult<Value> {
        let provider_error = |status: Option<u16>, message: String| WeatherError::Provider {
            coordinate: coord.to_string(),
            status,
            message,
        };

        let mut query = vec![
            ("lat", coord.lat.to_string()),
            ("lon", coord.lon.to_string()),
            ("appid", self.config.api_key.clone()),
        ];
        if let Some(units) = units.query_value() {
            query.push(("units", units.to_string()));
        }

        let response = self
            .client
            .get(&self.config.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("request timed out after {:?}", self.config.request_timeout)
                } else {
                    e.to_string()
                };
                provider_error(None, message)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let mut message = status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_string();
            if !body.is_empty() {
                message.push_str(": ");
                message.extend(body.chars().take(200));
            }
            return Err(provider_error(Some(status.as_u16()), message));
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| provider_error(Some(status.as_u16()), format!("invalid JSON body: {}", e)))?;

        debug!(status = status.as_u16(), "Provider responded");
        Ok(body)
    }
}

#[async_trait]
impl ObservationSource for OpenWeatherClient {
    async fn fetch(
        &self,
        coordinates: &[Coordinate],
        units: Units,
    ) -> WeatherResult<Vec<RawObservation>> {
        let mut observations = Vec::with_capacity(coordinates.len());

        for (i, coord) in coordinates.iter().enumerate() {
            if i > 0 && !self.config.request_delay.is_zero() {
                tokio::time::sleep(self.config.request_delay).await;
            }

            let body = self.fetch_one(coord, units).await?;
            observations.push(RawObservation::new(body, coord));
            info!(coordinate = %coord, "Fetched weather");
        }

        Ok(observations)
    }
}
