//! The normalized observation record published in every batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use sha1::{Digest, Sha1};

/// Constant tag identifying the provider and collection method.
pub const SOURCE_TAG: &str = "openweathermap_current";

/// Hex characters kept from the record digest.
pub const ID_LENGTH: usize = 16;

/// One normalized current-weather observation.
///
/// Fields are declared in lexical order so the serialized form has sorted keys,
/// which keeps batch bytes reproducible. Missing values serialize as `null`.
/// Provider numbers are kept exactly as received, integer or fractional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// When the record was produced by the transform step (not the observation time).
    pub collected_at: DateTime<Utc>,
    pub feels_like: Option<f64>,
    pub humidity: Option<Number>,
    /// Truncated digest of `(lat, lon, provider timestamp)`.
    pub id: String,
    pub lat: Option<f64>,
    pub location_name: Option<String>,
    pub lon: Option<f64>,
    pub pressure: Option<Number>,
    pub source: String,
    /// Provider epoch value, passed through unconverted.
    pub sunrise: Option<Value>,
    pub sunset: Option<Value>,
    pub temp: Option<f64>,
    /// Free-text condition description.
    pub weather: Option<String>,
    pub wind_deg: Option<Number>,
    pub wind_speed: Option<f64>,
}

/// Deterministic record id for a coordinate and provider observation time.
///
/// The digest input is `"{lat},{lon},{observed_at}"`. Fractional numbers
/// always carry a decimal point or exponent (`10.0`, `1e-05`), integers are
/// written as-is and an absent component is written as `None`.
pub fn record_id(lat: Option<&Value>, lon: Option<&Value>, observed_at: Option<&Value>) -> String {
    let material = format!(
        "{},{},{}",
        id_component(lat),
        id_component(lon),
        id_component(observed_at)
    );

    let digest = Sha1::digest(material.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ID_LENGTH);
    id
}

fn id_component(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() => float_text(f),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// Shortest round-trip text for a float, switching to exponent form outside
/// `1e-4 <= |v| < 1e16`.
fn float_text(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let scientific = format!("{:e}", value);
    if let Some((mantissa, exp)) = scientific.split_once('e') {
        if let Ok(exp) = exp.parse::<i32>() {
            if !(-4..16).contains(&exp) {
                let sign = if exp < 0 { '-' } else { '+' };
                return format!("{}e{}{:02}", mantissa, sign, exp.abs());
            }
        }
    }

    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> NormalizedRecord {
        NormalizedRecord {
            collected_at: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            feels_like: Some(-3.2),
            humidity: Some(81.into()),
            id: "0123456789abcdef".to_string(),
            lat: Some(49.6116),
            location_name: Some("Luxembourg".to_string()),
            lon: Some(6.1319),
            pressure: Some(1019.into()),
            source: SOURCE_TAG.to_string(),
            sunrise: Some(json!(1705303920)),
            sunset: Some(json!(1705335540)),
            temp: Some(1.4),
            weather: Some("overcast clouds".to_string()),
            wind_deg: None,
            wind_speed: None,
        }
    }

    fn sha1_prefix(material: &str) -> String {
        hex::encode(Sha1::digest(material.as_bytes()))[..ID_LENGTH].to_string()
    }

    #[test]
    fn test_missing_values_serialize_as_null() {
        let value = serde_json::to_value(sample()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 15);
        assert!(object["wind_deg"].is_null());
        assert!(object["wind_speed"].is_null());
    }

    #[test]
    fn test_serialized_keys_are_sorted() {
        let json = serde_json::to_string(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert!(json.starts_with(r#"{"collected_at":"2024-01-15T12:00:00Z","feels_like":-3.2,"humidity":81,"#));
    }

    #[test]
    fn test_fractional_numbers_serialize_unchanged() {
        let mut record = sample();
        record.pressure = Number::from_f64(1013.25);
        record.wind_deg = Number::from_f64(230.5);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""pressure":1013.25"#));
        assert!(json.contains(r#""wind_deg":230.5"#));
    }

    #[test]
    fn test_record_id_known_value() {
        let id = record_id(
            Some(&json!(49.6116)),
            Some(&json!(6.1319)),
            Some(&json!(1705320600)),
        );
        assert_eq!(id, sha1_prefix("49.6116,6.1319,1705320600"));
        assert_eq!(id.len(), ID_LENGTH);
    }

    #[test]
    fn test_record_id_keeps_decimal_point_on_whole_floats() {
        let id = record_id(Some(&json!(10.0)), Some(&json!(20.0)), Some(&json!(1705320600)));
        assert_eq!(id, sha1_prefix("10.0,20.0,1705320600"));
    }

    #[test]
    fn test_record_id_missing_timestamp() {
        let id = record_id(Some(&json!(10.0)), Some(&json!(20.0)), None);
        assert_eq!(id, sha1_prefix("10.0,20.0,None"));
        assert_eq!(id, record_id(Some(&json!(10.0)), Some(&json!(20.0)), Some(&Value::Null)));
    }

    #[test]
    fn test_record_id_integer_and_string_components() {
        let id = record_id(Some(&json!(10)), Some(&json!(-20)), Some(&json!("1705320600")));
        assert_eq!(id, sha1_prefix("10,-20,1705320600"));
    }

    #[test]
    fn test_float_text() {
        assert_eq!(float_text(49.6116), "49.6116");
        assert_eq!(float_text(-87.6298), "-87.6298");
        assert_eq!(float_text(10.0), "10.0");
        assert_eq!(float_text(-0.0), "-0.0");
        assert_eq!(float_text(0.0), "0.0");
        assert_eq!(float_text(0.0001), "0.0001");
        assert_eq!(float_text(0.00001), "1e-05");
        assert_eq!(float_text(1.5e16), "1.5e+16");
        assert_eq!(float_text(1e15), "1000000000000000.0");
    }
}
