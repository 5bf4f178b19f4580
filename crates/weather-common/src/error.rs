//! Error types for the weather products services.

use thiserror::Error;

/// Result type alias using WeatherError.
pub type WeatherResult<T> = Result<T, WeatherError>;

/// Primary error type for collection and listing operations.
#[derive(Debug, Error)]
pub enum WeatherError {
    // === Write path ===
    #[error("Provider request failed for {coordinate}{}: {message}", status.map(|s| format!(" (status {})", s)).unwrap_or_default())]
    Provider {
        coordinate: String,
        status: Option<u16>,
        message: String,
    },

    #[error("Raw observation {index} is not usable: {message}")]
    TransformContract { index: usize, message: String },

    #[error("Batch object already exists: {0}")]
    KeyCollision(String),

    #[error("Failed to publish {key}: {message}")]
    Publish { key: String, message: String },

    // === Read path ===
    #[error("Storage error: {0}")]
    StorageAccess(String),

    #[error("Malformed batch {key} at line {line}: {message}")]
    MalformedBatch {
        key: String,
        line: usize,
        message: String,
    },

    // === Configuration ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl WeatherError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            WeatherError::InvalidConfig(_) => 400,
            WeatherError::Provider { .. } => 502,
            _ => 500,
        }
    }

    /// Short label used for metrics and status reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            WeatherError::Provider { .. } => "provider",
            WeatherError::TransformContract { .. } => "transform_contract",
            WeatherError::KeyCollision(_) => "key_collision",
            WeatherError::Publish { .. } => "publish",
            WeatherError::StorageAccess(_) => "storage_access",
            WeatherError::MalformedBatch { .. } => "malformed_batch",
            WeatherError::InvalidConfig(_) => "invalid_config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_message_includes_status() {
        let err = WeatherError::Provider {
            coordinate: "Chicago (41.8781, -87.6298)".to_string(),
            status: Some(401),
            message: "Unauthorized".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("Chicago"));
        assert!(text.contains("status 401"));
        assert_eq!(err.kind(), "provider");
    }

    #[test]
    fn test_provider_error_without_status() {
        let err = WeatherError::Provider {
            coordinate: "1, 2".to_string(),
            status: None,
            message: "operation timed out".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Provider request failed for 1, 2: operation timed out"
        );
    }

    #[test]
    fn test_read_path_errors_are_server_errors() {
        assert_eq!(WeatherError::StorageAccess("denied".into()).http_status_code(), 500);
        let malformed = WeatherError::MalformedBatch {
            key: "weather-products/2024/01/15/120000.jsonl".into(),
            line: 3,
            message: "expected value".into(),
        };
        assert_eq!(malformed.http_status_code(), 500);
        assert!(malformed.to_string().contains("line 3"));
    }
}
