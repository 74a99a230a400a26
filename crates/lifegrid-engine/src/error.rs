//! Error types for the server binary.

/// Top-level error for the server binary.
///
/// Each variant wraps one subsystem's error so `main` can propagate
/// everything with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: lifegrid_core::config::ConfigError,
    },

    /// The tick loop could not be started.
    #[error("game manager error: {source}")]
    Manager {
        /// The underlying manager error.
        #[from]
        source: lifegrid_core::manager::ManagerError,
    },

    /// The websocket server failed to bind or crashed.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: lifegrid_server::ServerError,
    },
}
