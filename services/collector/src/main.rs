//! Weather collector service.
//!
//! Fetches current conditions for a configured set of coordinates,
//! normalizes them and publishes one NDJSON batch per run with:
//! - Runs aligned to the configured interval (hourly by default)
//! - Single-run mode for cron and container jobs
//! - HTTP status API for monitoring and on-demand runs

use std::env;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use collection::{BatchPublisher, MetricsObserver, OpenWeatherClient, Pipeline};
use collector::config::{Args, CollectorConfig};
use collector::scheduler::{Scheduler, Trigger};
use collector::server::{self, ServerState};
use storage::ObjectStorage;
use weather_common::load_env_file;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env and the agent-rendered secrets file
    dotenvy::dotenv().ok();
    let env_file = env::var("ENV_FILE").unwrap_or_else(|_| "/secrets/.env".to_string());
    load_env_file(&env_file)?;

    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting weather collector");

    // Initialize Prometheus metrics exporter
    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    let config = CollectorConfig::from_args(&args)?;

    info!(
        coordinates = config.coordinates.len(),
        units = ?config.units,
        bucket = %config.storage.bucket,
        prefix = %config.prefix,
        interval_secs = config.interval.as_secs(),
        "Collector configured"
    );

    let source = Arc::new(OpenWeatherClient::new(config.source.clone())?);
    let storage = Arc::new(ObjectStorage::new(&config.storage)?);
    let publisher = BatchPublisher::new(storage, &config.prefix);
    let pipeline = Pipeline::new(source, publisher, config.coordinates.clone(), config.units);

    let scheduler = Arc::new(Scheduler::new(
        pipeline,
        Arc::new(MetricsObserver),
        config.interval,
    ));

    if args.once {
        // Single run mode
        info!("Running single collection");
        let report = scheduler.run_once(Trigger::Manual).await?;
        info!(
            records = report.records,
            location = report.outcome.location().unwrap_or("-"),
            "Collection finished"
        );
        return Ok(());
    }

    // Start status server (unless disabled)
    if !args.no_status_server {
        let server_state = Arc::new(ServerState {
            scheduler: scheduler.clone(),
            prometheus: Some(prometheus_handle),
        });
        let status_port = args.status_port;
        tokio::spawn(async move {
            if let Err(e) = server::start_server(server_state, status_port).await {
                tracing::error!(error = %e, "Status server failed");
            }
        });
    }

    // Shutdown signal
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        shutdown_tx_clone.send(()).ok();
    });

    info!("Starting scheduled collection");
    scheduler.run_forever(shutdown_tx.subscribe()).await;

    info!("Collector stopped");
    Ok(())
}
