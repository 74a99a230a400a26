//! Axum router construction.
//!
//! Two routes: the game websocket on the configured path and a plain
//! `GET /health` probe. Every request is traced.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// - `GET <ws_path>` -- game `WebSocket`
/// - `GET /health` -- liveness probe, returns `OK`
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(&state.ws_path, get(ws::ws_game))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
