use std::time::Duration;

use tracing_subscriber::EnvFilter;

use blast_core::map::MapStore;
use blast_server::config::ServerConfig;
use blast_server::sim::{SimCommand, SimSettings, spawn_sim_loop};
use blast_server::stats::{JsonlBackend, NullBackend, StatsBackend, spawn_stats_worker};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("BLAST server starting");

    let config = ServerConfig::load();
    config.validate();

    let map_store = match std::fs::read_to_string(&config.maps_file) {
        Ok(content) => match MapStore::from_toml_str(&content) {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(file = %config.maps_file, error = %e, "failed to parse map catalog");
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!(file = %config.maps_file, error = %e, "failed to read map catalog");
            std::process::exit(1);
        }
    };
    if map_store.is_empty() {
        tracing::error!(file = %config.maps_file, "map catalog holds no maps");
        std::process::exit(1);
    }

    let backend: Box<dyn StatsBackend> = match (&config.stats.enabled, &config.stats.path) {
        (true, Some(path)) => match JsonlBackend::open(path) {
            Ok(backend) => Box::new(backend),
            Err(e) => {
                tracing::error!(path = %path, error = %e, "failed to open stats file");
                std::process::exit(1);
            }
        },
        _ => Box::new(NullBackend),
    };
    let (stats_tx, stats_handle) = spawn_stats_worker(backend);

    let (cmd_tx, mut event_rx, sim_handle) = spawn_sim_loop(SimSettings {
        engine: config.engine_config(),
        queue: config.queue_config(),
        map_store,
        map_name: config.match_settings.map.clone(),
        tick_interval: Duration::from_secs(1),
        stats_tx: Some(stats_tx),
    });

    // Until the plugin bridge lands, engine events surface in the logs.
    let event_logger = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            tracing::debug!(?event, "engine event");
        }
    });

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
    let _ = cmd_tx.send(SimCommand::Shutdown);
    let _ = sim_handle.await;
    let _ = event_logger.await;
    let _ = stats_handle.await;
}
