//! Common test fixtures for weather-products tests.
//!
//! Provider bodies follow the OpenWeatherMap current-conditions shape.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use weather_common::{record_id, Coordinate, NormalizedRecord, SOURCE_TAG};

/// Observation timestamp shared by the canned responses.
pub const OBSERVED_AT: i64 = 1705320600;

/// The two default coordinates, as configured.
pub fn coordinates() -> Vec<Coordinate> {
    vec![
        Coordinate::new("Luxembourg", 49.6116, 6.1319),
        Coordinate::new("Chicago", 41.8781, -87.6298),
    ]
}

/// Full response for Luxembourg.
pub fn luxembourg_response() -> Value {
    json!({
        "coord": {"lon": 6.1319, "lat": 49.6116},
        "weather": [{"id": 804, "main": "Clouds", "description": "overcast clouds", "icon": "04d"}],
        "base": "stations",
        "main": {
            "temp": 1.42,
            "feels_like": -2.17,
            "temp_min": 0.51,
            "temp_max": 2.23,
            "pressure": 1021,
            "humidity": 87
        },
        "visibility": 10000,
        "wind": {"speed": 3.6, "deg": 230},
        "clouds": {"all": 100},
        "dt": OBSERVED_AT,
        "sys": {"type": 2, "id": 2005540, "country": "LU", "sunrise": 1705303940, "sunset": 1705335602},
        "timezone": 3600,
        "id": 2960316,
        "name": "Luxembourg City",
        "cod": 200
    })
}

/// Response for Chicago, including gusts and a rain section.
pub fn chicago_response() -> Value {
    json!({
        "coord": {"lon": -87.6298, "lat": 41.8781},
        "weather": [{"id": 600, "main": "Snow", "description": "light snow", "icon": "13n"}],
        "base": "stations",
        "main": {
            "temp": -18.3,
            "feels_like": -27.9,
            "pressure": 1030,
            "humidity": 70
        },
        "visibility": 4828,
        "wind": {"speed": 6.17, "deg": 270, "gust": 9.26},
        "snow": {"1h": 0.25},
        "dt": OBSERVED_AT,
        "sys": {"type": 2, "id": 2075214, "country": "US", "sunrise": 1705324020, "sunset": 1705358520},
        "timezone": -21600,
        "id": 4887398,
        "name": "Chicago",
        "cod": 200
    })
}

/// Canned response for a coordinate from [`coordinates`].
pub fn response_for(coord: &Coordinate) -> Value {
    if coord.lat > 45.0 {
        luxembourg_response()
    } else {
        chicago_response()
    }
}

/// Two normalized records collected at `collected_at`, as produced from the
/// canned responses. The Chicago record has its optional sections stripped.
pub fn sample_records(collected_at: DateTime<Utc>) -> Vec<NormalizedRecord> {
    let observed_at = json!(OBSERVED_AT);
    vec![
        NormalizedRecord {
            collected_at,
            feels_like: Some(-2.17),
            humidity: Some(87.into()),
            id: record_id(Some(&json!(49.6116)), Some(&json!(6.1319)), Some(&observed_at)),
            lat: Some(49.6116),
            location_name: Some("Luxembourg".to_string()),
            lon: Some(6.1319),
            pressure: Some(1021.into()),
            source: SOURCE_TAG.to_string(),
            sunrise: Some(json!(1705303940)),
            sunset: Some(json!(1705335602)),
            temp: Some(1.42),
            weather: Some("overcast clouds".to_string()),
            wind_deg: Some(230.into()),
            wind_speed: Some(3.6),
        },
        NormalizedRecord {
            collected_at,
            feels_like: Some(-27.9),
            humidity: Some(70.into()),
            id: record_id(Some(&json!(41.8781)), Some(&json!(-87.6298)), Some(&observed_at)),
            lat: Some(41.8781),
            location_name: Some("Chicago".to_string()),
            lon: Some(-87.6298),
            pressure: Some(1030.into()),
            source: SOURCE_TAG.to_string(),
            sunrise: None,
            sunset: None,
            temp: Some(-18.3),
            weather: None,
            wind_deg: None,
            wind_speed: None,
        },
    ]
}
