//! Secret and environment resolution performed before the pipeline starts.
//!
//! Secrets are looked up as `NAME_FILE` (path to a file holding the value)
//! first, then `NAME`. Env files written by a secrets agent are loaded
//! without overriding variables that are already set.

use std::env;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{WeatherError, WeatherResult};

/// Load variables from an env file if it exists.
///
/// Returns whether a file was loaded. Existing variables take precedence.
pub fn load_env_file(path: impl AsRef<Path>) -> WeatherResult<bool> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "No env file found");
        return Ok(false);
    }

    dotenvy::from_path(path).map_err(|e| {
        WeatherError::InvalidConfig(format!("Failed to load {}: {}", path.display(), e))
    })?;
    info!(path = %path.display(), "Loaded env file");
    Ok(true)
}

/// Resolve a secret from the process environment.
pub fn resolve_secret(name: &str, default: Option<&str>) -> WeatherResult<String> {
    resolve_secret_with(name, default, |key| env::var(key).ok())
}

/// Resolve a secret using an arbitrary variable lookup.
pub fn resolve_secret_with<F>(name: &str, default: Option<&str>, lookup: F) -> WeatherResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(file_path) = lookup(&format!("{}_FILE", name)) {
        let path = Path::new(&file_path);
        if path.exists() {
            let value = std::fs::read_to_string(path).map_err(|e| {
                WeatherError::InvalidConfig(format!("Failed to read {}: {}", file_path, e))
            })?;
            debug!(secret = name, "Resolved secret from file");
            return Ok(value.trim().to_string());
        }
    }

    match lookup(name).filter(|v| !v.is_empty()) {
        Some(value) => Ok(value),
        None => default.map(str::to_string).ok_or_else(|| {
            WeatherError::InvalidConfig(format!(
                "{} not set (checked env var and {}_FILE)",
                name, name
            ))
        }),
    }
}
