//! Newline-delimited JSON codec for batch objects.
//!
//! A batch body is one compact JSON document per line joined by `\n`, with
//! no blank lines and no trailing newline.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{WeatherError, WeatherResult};

/// Encode a single record as compact JSON.
pub fn encode_record<T: Serialize>(record: &T) -> serde_json::Result<String> {
    serde_json::to_string(record)
}

/// Encode records into a batch body.
pub fn encode_batch<T: Serialize>(records: &[T]) -> serde_json::Result<Bytes> {
    let lines = records
        .iter()
        .map(encode_record)
        .collect::<serde_json::Result<Vec<_>>>()?;
    Ok(Bytes::from(lines.join("\n")))
}

/// Decode a batch body read from `key`.
///
/// Blank lines are skipped. The first line that does not parse fails the
/// whole batch with [`WeatherError::MalformedBatch`].
pub fn decode_batch<T: DeserializeOwned>(key: &str, body: &[u8]) -> WeatherResult<Vec<T>> {
    let text = std::str::from_utf8(body).map_err(|e| WeatherError::MalformedBatch {
        key: key.to_string(),
        line: 0,
        message: format!("invalid UTF-8: {}", e),
    })?;

    let mut records = Vec::new();
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|e| WeatherError::MalformedBatch {
            key: key.to_string(),
            line: index + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }

    Ok(records)
}
