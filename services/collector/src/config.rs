//! Configuration resolution for the collector.
//!
//! Everything here runs before the pipeline is built: CLI flags and
//! environment, `*_FILE` secrets, and the optional YAML coordinate file.
//! The pipeline only ever sees the resolved [`CollectorConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use collection::SourceConfig;
use storage::ObjectStorageConfig;
use weather_common::{resolve_secret, Coordinate, Units};

pub const DEFAULT_BUCKET: &str = "dagster-weather-products";
pub const DEFAULT_PREFIX: &str = "weather-products/";

/// Longest accepted run interval (one week).
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Parser, Debug, Clone)]
#[command(name = "collector")]
#[command(about = "Current-weather collector publishing NDJSON batches")]
pub struct Args {
    /// Run once and exit (vs scheduled runs)
    #[arg(long)]
    pub once: bool,

    /// Seconds between scheduled runs; runs align to multiples of this
    #[arg(long, env = "RUN_INTERVAL_SECS", default_value = "3600")]
    pub interval_secs: u64,

    /// YAML file listing the coordinates to collect
    #[arg(long, env = "COORDINATES_FILE")]
    pub coordinates_file: Option<PathBuf>,

    /// Provider unit system: metric, imperial or standard
    #[arg(long, env = "WEATHER_UNITS", default_value = "metric")]
    pub units: String,

    /// Provider endpoint
    #[arg(long, env = "OPENWEATHER_URL", default_value = collection::source::OPENWEATHER_URL)]
    pub provider_url: String,

    /// Bucket to publish to (default: WEATHER_RESULTS_BUCKET[_FILE])
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix for published batches
    #[arg(long, env = "WEATHER_RESULTS_PREFIX", default_value = DEFAULT_PREFIX)]
    pub prefix: String,

    /// Custom S3 endpoint (MinIO, LocalStack)
    #[arg(long, env = "S3_ENDPOINT")]
    pub s3_endpoint: Option<String>,

    /// S3 region
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// Allow plain HTTP to the S3 endpoint
    #[arg(long, env = "S3_ALLOW_HTTP")]
    pub allow_http: bool,

    /// Use conditional puts so existing batch keys are refused atomically
    #[arg(long, env = "S3_CONDITIONAL_PUT")]
    pub conditional_put: bool,

    /// Port for status HTTP server
    #[arg(long, env = "STATUS_PORT", default_value = "9090")]
    pub status_port: u16,

    /// Disable status HTTP server
    #[arg(long)]
    pub no_status_server: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Coordinate file layout.
#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatesFile {
    pub coords: Vec<Coordinate>,
}

/// Fully resolved collector configuration.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub source: SourceConfig,
    pub storage: ObjectStorageConfig,
    pub prefix: String,
    pub coordinates: Vec<Coordinate>,
    pub units: Units,
    pub interval: Duration,
}

impl CollectorConfig {
    /// Resolve configuration from parsed arguments and the environment.
    pub fn from_args(args: &Args) -> Result<Self> {
        let api_key = resolve_secret("OPENWEATHER_API_KEY", None)?;
        let bucket = match &args.bucket {
            Some(bucket) => bucket.clone(),
            None => resolve_secret("WEATHER_RESULTS_BUCKET", Some(DEFAULT_BUCKET))?,
        };

        let coordinates = match &args.coordinates_file {
            Some(path) => load_coordinates(path)?,
            None => {
                info!("No coordinates file configured, using defaults");
                Coordinate::defaults()
            }
        };

        let mut source = SourceConfig::new(api_key);
        source.base_url = args.provider_url.clone();

        Ok(Self {
            source,
            storage: ObjectStorageConfig {
                bucket,
                endpoint: args.s3_endpoint.clone(),
                region: args.region.clone(),
                allow_http: args.allow_http,
                conditional_put: args.conditional_put,
            },
            prefix: args.prefix.clone(),
            coordinates,
            units: args.units.parse()?,
            interval: run_interval(args.interval_secs)?,
        })
    }
}

/// Validate the scheduled run interval.
pub fn run_interval(secs: u64) -> Result<Duration> {
    if secs == 0 {
        bail!("interval must be at least one second");
    }
    if secs > MAX_INTERVAL_SECS {
        bail!(
            "interval of {}s exceeds the maximum of {}s",
            secs,
            MAX_INTERVAL_SECS
        );
    }
    Ok(Duration::from_secs(secs))
}

/// Load and validate coordinates from a YAML file.
pub fn load_coordinates(path: &Path) -> Result<Vec<Coordinate>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: CoordinatesFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if file.coords.is_empty() {
        warn!(path = %path.display(), "Coordinates file is empty, runs will publish nothing");
    }
    for coord in &file.coords {
        validate_coordinate(coord)?;
    }

    info!(path = %path.display(), count = file.coords.len(), "Loaded coordinates");
    Ok(file.coords)
}

fn validate_coordinate(coord: &Coordinate) -> Result<()> {
    if !(-90.0..=90.0).contains(&coord.lat) {
        bail!("latitude out of range for {}", coord);
    }
    if !(-180.0..=180.0).contains(&coord.lon) {
        bail!("longitude out of range for {}", coord);
    }
    Ok(())
}
