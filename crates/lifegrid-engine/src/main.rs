//! Server binary for the lifegrid simulation.
//!
//! Wires the grid engine, the game manager, the snapshot saver, and the
//! websocket server together, then runs until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `lifegrid-config.yaml` plus environment
//! 2. Initialize structured logging (tracing)
//! 3. Create the grid and the game manager
//! 4. Restore the newest snapshot, or seed the default pattern
//! 5. Start periodic saving and the tick loop
//! 6. Serve websocket clients until Ctrl-C
//! 7. Stop ticking and saving, then write a final snapshot

mod error;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lifegrid_core::config::{LifegridConfig, LogFormat, LoggingConfig};
use lifegrid_core::manager::GameManager;
use lifegrid_core::saver::SnapshotManager;
use lifegrid_grid::SparseGrid;
use lifegrid_server::{AppState, start_server};
use lifegrid_types::Cell;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "lifegrid-config.yaml";

/// Vertical blinker placed on an empty grid.
const DEFAULT_PATTERN: [Cell; 3] = [Cell::new(0, -1), Cell::new(0, 0), Cell::new(0, 1)];

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid, the tick loop cannot be
/// started, or the server fails to bind.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = LifegridConfig::load(Path::new(CONFIG_PATH)).map_err(EngineError::from)?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        host = %config.server.host,
        port = config.server.port,
        ws_path = %config.server.ws_path,
        tick_interval_ms = config.game.tick_interval_ms,
        save_interval_secs = config.persistence.save_interval_secs,
        "lifegrid-engine starting"
    );

    // 3. Create the grid and its manager.
    let manager = Arc::new(GameManager::new(Arc::new(SparseGrid::new())));
    let saver = Arc::new(SnapshotManager::new(
        Arc::clone(&manager),
        config.persistence.clone(),
    ));

    // 4. Restore or seed.
    restore_or_seed(&manager, &saver).await;

    // 5. Background work.
    saver.start_saving().await;
    manager
        .start(Duration::from_millis(config.game.tick_interval_ms))
        .await
        .map_err(EngineError::from)?;

    // 6. Serve until Ctrl-C.
    let state = Arc::new(AppState::new(Arc::clone(&manager), &config));
    let served = start_server(&config.server, state, shutdown_signal()).await;

    // 7. Wind down, saving even if the server failed.
    manager.stop().await;
    saver.stop_saving().await;
    if saver.is_enabled() {
        match saver.save_now().await {
            Ok(path) => info!(path = %path.display(), "final snapshot written"),
            Err(e) => error!(error = %e, "final snapshot failed"),
        }
    }
    served.map_err(EngineError::from)?;

    let stats = manager.stats().await;
    info!(
        generation = stats.generation,
        birth_count = stats.birth_count,
        death_count = stats.death_count,
        "lifegrid-engine shutdown complete"
    );
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Load the newest snapshot. If there is none, or it cannot be read,
/// start from [`DEFAULT_PATTERN`] instead.
async fn restore_or_seed(manager: &GameManager, saver: &SnapshotManager) {
    let restored = match saver.load_latest().await {
        Ok(restored) => restored,
        Err(e) => {
            warn!(
                dir = %saver.save_dir().display(),
                error = %e,
                "snapshot restore failed, starting fresh"
            );
            false
        }
    };

    if !restored {
        manager
            .mutate(|grid| grid.set_cells(&DEFAULT_PATTERN))
            .await;
        info!(cells = DEFAULT_PATTERN.len(), "seeded default pattern");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
