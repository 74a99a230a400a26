//! Shared application state for the websocket server.
//!
//! [`AppState`] is built once at startup and injected into every handler
//! via Axum's `State` extractor. It carries the game manager, the command
//! registry, and the per-connection limits from configuration.

use std::sync::Arc;
use std::time::Duration;

use lifegrid_core::config::LifegridConfig;
use lifegrid_core::manager::GameManager;

use crate::commands::register_defaults;
use crate::registry::CommandRegistry;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The one game every connection talks to.
    pub manager: Arc<GameManager>,
    /// Command handlers.
    pub registry: Arc<CommandRegistry>,
    /// Path accepting websocket upgrades.
    pub ws_path: String,
    /// Refuse upgrades whose `Origin` does not match `Host`.
    pub origin_check: bool,
    /// Commands a connection may run at once.
    pub max_in_flight_commands: usize,
}

impl AppState {
    /// Build state with the default command set.
    pub fn new(manager: Arc<GameManager>, config: &LifegridConfig) -> Self {
        let timeout = (config.server.command_timeout_ms > 0)
            .then(|| Duration::from_millis(config.server.command_timeout_ms));
        let mut registry = CommandRegistry::new().with_timeout(timeout);
        register_defaults(&mut registry, config.game.max_observe_region_size);

        Self {
            manager,
            registry: Arc::new(registry),
            ws_path: config.server.ws_path.clone(),
            origin_check: config.server.origin_check,
            max_in_flight_commands: config.server.max_in_flight_commands,
        }
    }
}
