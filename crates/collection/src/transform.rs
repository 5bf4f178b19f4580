//! Normalization of raw provider responses into flat records.

use chrono::{DateTime, Utc};
use serde_json::{Map, Number, Value};

use weather_common::{record_id, NormalizedRecord, WeatherError, WeatherResult, SOURCE_TAG};

use crate::source::RawObservation;

/// Normalize a batch of raw observations, stamping them with the current time.
pub fn transform(raw: &[RawObservation]) -> WeatherResult<Vec<NormalizedRecord>> {
    transform_at(raw, Utc::now())
}

/// Normalize a batch of raw observations with an explicit collection time.
///
/// Output order matches input order. Fails only when an observation body is
/// not a JSON object.
pub fn transform_at(
    raw: &[RawObservation],
    collected_at: DateTime<Utc>,
) -> WeatherResult<Vec<NormalizedRecord>> {
    raw.iter()
        .enumerate()
        .map(|(index, observation)| normalize(index, observation, collected_at))
        .collect()
}

fn normalize(
    index: usize,
    observation: &RawObservation,
    collected_at: DateTime<Utc>,
) -> WeatherResult<NormalizedRecord> {
    let body = observation
        .body
        .as_object()
        .ok_or_else(|| WeatherError::TransformContract {
            index,
            message: format!("expected a JSON object, got {}", type_name(&observation.body)),
        })?;
    let meta = &observation.meta;

    let main = section(body, "main");
    let wind = section(body, "wind");
    let sys = section(body, "sys");
    let coord = section(body, "coord");

    let location_name = first_match([
        meta.requested_name.clone().filter(|n| !n.is_empty()),
        text(body.get("name")),
    ]);

    // The id hashes the same value the record carries, in its received form.
    let requested_lat = Value::from(meta.requested_lat);
    let requested_lon = Value::from(meta.requested_lon);
    let lat_value = first_match([numeric(field(coord, "lat")), Some(&requested_lat)]);
    let lon_value = first_match([numeric(field(coord, "lon")), Some(&requested_lon)]);

    let weather = body
        .get("weather")
        .and_then(Value::as_array)
        .and_then(|conditions| conditions.first())
        .and_then(|condition| text(condition.get("description")));

    Ok(NormalizedRecord {
        collected_at,
        feels_like: float(field(main, "feels_like")),
        humidity: number(field(main, "humidity")),
        id: record_id(lat_value, lon_value, body.get("dt")),
        lat: lat_value.and_then(Value::as_f64),
        location_name,
        lon: lon_value.and_then(Value::as_f64),
        pressure: number(field(main, "pressure")),
        source: SOURCE_TAG.to_string(),
        sunrise: passthrough(field(sys, "sunrise")),
        sunset: passthrough(field(sys, "sunset")),
        temp: float(field(main, "temp")),
        weather,
        wind_deg: number(field(wind, "deg")),
        wind_speed: float(field(wind, "speed")),
    })
}

/// Evaluate candidates in order; the first present value wins.
fn first_match<T, const N: usize>(candidates: [Option<T>; N]) -> Option<T> {
    candidates.into_iter().flatten().next()
}

fn section<'a>(body: &'a Map<String, Value>, name: &str) -> Option<&'a Map<String, Value>> {
    body.get(name).and_then(Value::as_object)
}

fn field<'a>(section: Option<&'a Map<String, Value>>, name: &str) -> Option<&'a Value> {
    section.and_then(|s| s.get(name))
}

fn numeric(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| v.is_number())
}

fn float(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64)
}

fn number(value: Option<&Value>) -> Option<Number> {
    match value {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}

fn passthrough(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
