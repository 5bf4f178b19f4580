//! Configured collection coordinates and provider unit systems.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WeatherError;

/// A geographic point to collect observations for.
///
/// Identity is `(lat, lon)`; `name` is only a display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(default)]
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: Some(name.into()),
            lat,
            lon,
        }
    }

    pub fn unnamed(lat: f64, lon: f64) -> Self {
        Self {
            name: None,
            lat,
            lon,
        }
    }

    /// Built-in collection points used when no coordinate file is configured.
    pub fn defaults() -> Vec<Coordinate> {
        vec![
            Coordinate::new("Luxembourg", 49.6116, 6.1319),
            Coordinate::new("Chicago", 41.8781, -87.6298),
        ]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({}, {})", name, self.lat, self.lon),
            None => write!(f, "{}, {}", self.lat, self.lon),
        }
    }
}

/// Unit system requested from the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    /// Provider default (Kelvin, m/s). No `units` parameter is sent.
    Standard,
}

impl Units {
    /// Value for the provider's `units` query parameter.
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            Units::Metric => Some("metric"),
            Units::Imperial => Some("imperial"),
            Units::Standard => None,
        }
    }
}

impl FromStr for Units {
    type Err = WeatherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            "standard" | "default" | "" => Ok(Units::Standard),
            other => Err(WeatherError::InvalidConfig(format!(
                "unknown units '{}', expected metric, imperial or standard",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_named_and_unnamed() {
        assert_eq!(
            Coordinate::new("Luxembourg", 49.6116, 6.1319).to_string(),
            "Luxembourg (49.6116, 6.1319)"
        );
        assert_eq!(Coordinate::unnamed(41.5, -87.25).to_string(), "41.5, -87.25");
    }

    #[test]
    fn test_units_parsing() {
        assert_eq!("metric".parse::<Units>().unwrap(), Units::Metric);
        assert_eq!("IMPERIAL".parse::<Units>().unwrap(), Units::Imperial);
        assert_eq!("standard".parse::<Units>().unwrap(), Units::Standard);
        assert!("kelvin".parse::<Units>().is_err());
        assert_eq!(Units::Standard.query_value(), None);
        assert_eq!(Units::default().query_value(), Some("metric"));
    }

    #[test]
    fn test_coordinate_name_is_optional_in_config() {
        let coord: Coordinate = serde_json::from_str(r#"{"lat": 1.5, "lon": 2.5}"#).unwrap();
        assert_eq!(coord, Coordinate::unnamed(1.5, 2.5));
    }
}
