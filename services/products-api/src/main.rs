//! Products API service.
//!
//! Serves the most recent weather batches from object storage over HTTP.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use products_api::{build_router, AppState};
use storage::{ObjectStorage, ObjectStorageConfig};
use weather_common::{load_env_file, resolve_secret};

const DEFAULT_BUCKET: &str = "dagster-weather-products";

#[derive(Parser, Debug)]
#[command(name = "products-api")]
#[command(about = "HTTP API for published weather products")]
struct Args {
    /// Listen address
    #[arg(short, long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8000")]
    listen: String,

    /// Bucket holding the batches (default: WEATHER_RESULTS_BUCKET[_FILE])
    #[arg(long)]
    bucket: Option<String>,

    /// Key prefix the batches are published under
    #[arg(long, env = "WEATHER_RESULTS_PREFIX", default_value = "weather-products/")]
    prefix: String,

    /// Custom S3 endpoint (MinIO, LocalStack)
    #[arg(long, env = "S3_ENDPOINT")]
    s3_endpoint: Option<String>,

    /// S3 region
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// Allow plain HTTP to the S3 endpoint
    #[arg(long, env = "S3_ALLOW_HTTP")]
    allow_http: bool,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env and the agent-rendered env file
    dotenvy::dotenv().ok();
    let env_file = env::var("ENV_FILE").unwrap_or_else(|_| "/app/.env".to_string());
    load_env_file(&env_file)?;

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    let bucket = match args.bucket {
        Some(bucket) => bucket,
        None => resolve_secret("WEATHER_RESULTS_BUCKET", Some(DEFAULT_BUCKET))?,
    };

    let storage_config = ObjectStorageConfig {
        bucket,
        endpoint: args.s3_endpoint,
        region: args.region,
        allow_http: args.allow_http,
        conditional_put: false,
    };
    let storage = Arc::new(ObjectStorage::new(&storage_config)?);

    let state = Arc::new(AppState::new(storage, &args.prefix).with_prometheus(prometheus_handle));
    let app = build_router(state.clone());

    let addr: SocketAddr = args
        .listen
        .parse()
        .with_context(|| format!("Invalid listen address: {}", args.listen))?;

    info!(
        addr = %addr,
        bucket = %storage_config.bucket,
        prefix = %state.prefix,
        "Starting products API"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
