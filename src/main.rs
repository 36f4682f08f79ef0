//! Prometheus exporter for MQTT-announced home sensors.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use sensor_exporter::config::LogFormat;
use sensor_exporter::{
    DeviceRegistry, DiscoveryWatcher, ExporterConfig, ExporterStats, HttpServer, LiveMetrics,
    MqttBridge, SelfMetrics, SensorSet, UpdateIngestor,
};

/// Prometheus exporter for MQTT-announced home sensors.
#[derive(Parser, Debug)]
#[command(name = "sensor-exporter")]
#[command(about = "Expose MQTT sensor values as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// Latitude for the sunrise/sunset metrics (overrides config).
    #[arg(long)]
    latitude: Option<f64>,

    /// Longitude for the sunrise/sunset metrics (overrides config).
    #[arg(long)]
    longitude: Option<f64>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI overrides
    if let Some(listen) = args.listen {
        config.exposition.listen = listen;
    }
    if let Some(latitude) = args.latitude {
        config.location.latitude = latitude;
    }
    if let Some(longitude) = args.longitude {
        config.location.longitude = longitude;
    }
    config.validate()?;

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("sensor_exporter={}", log_level).parse()?)
        .add_directive(format!("rumqttc={}", Level::WARN).parse()?);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!("Starting sensor exporter");

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Shared state: the registry, the live push samples and the counters
    let registry = Arc::new(DeviceRegistry::new());
    let live = Arc::new(LiveMetrics::new());
    let stats = Arc::new(ExporterStats::new());

    // Wire the components
    let discovery = DiscoveryWatcher::new(
        registry.clone(),
        stats.clone(),
        config.mqtt.announce_prefix.clone(),
    );
    let ingestor = UpdateIngestor::new(registry.clone(), live.clone(), stats.clone());
    let bridge = MqttBridge::new(config.mqtt.clone(), discovery, ingestor);

    let sensors = Arc::new(SensorSet::new(registry.clone(), &config.location));
    let self_metrics = Arc::new(SelfMetrics::new(
        registry.clone(),
        live.clone(),
        stats.clone(),
    ));

    let listen_addr = config
        .exposition
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;
    let http_server = HttpServer::new(
        sensors,
        self_metrics,
        listen_addr,
        config.exposition.metrics_path.clone(),
        config.exposition.sensors_path.clone(),
    );

    // Start the MQTT bridge
    let bridge_shutdown = shutdown_rx.clone();
    let bridge_task = tokio::spawn(async move {
        if let Err(e) = bridge.run(bridge_shutdown).await {
            error!("MQTT bridge error: {}", e);
        }
    });

    // Start the HTTP server
    let http_shutdown = shutdown_rx.clone();
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(http_shutdown).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).expect("failed to install SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown and give the tasks a bounded window to drain
    shutdown_tx.send(true)?;
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = bridge_task.await;
        let _ = http_task.await;
    })
    .await;

    // Print final stats
    let stats = stats.snapshot();
    info!(
        devices = registry.len(),
        updates_received = stats.updates_received,
        updates_applied = stats.updates_applied,
        updates_discarded = stats.updates_discarded,
        announcements = stats.announcements_received,
        "Final statistics"
    );

    info!("Exporter stopped");
    Ok(())
}
