//! Websocket server for the lifegrid simulation.
//!
//! Clients connect to the game `WebSocket` and drive the shared grid with
//! JSON commands (`set_cells`, `clear_cells`, `sync`, `observe`,
//! `unobserve`). Replies and region diffs come back as
//! `<code>;<json>\r\n` text frames.
//!
//! # Architecture
//!
//! Every connection gets a [`Connection`] holding its socket write half,
//! a write lock, and at most one region subscription. Each inbound frame
//! is routed through the [`CommandRegistry`] on its own task, with its own
//! bounded output channel, so a slow command never blocks the read loop.
//! Region diffs are pushed from the grid's observers into the channel of
//! the `observe` command that created them.
//!
//! [`Connection`]: connection::Connection
//! [`CommandRegistry`]: registry::CommandRegistry

pub mod commands;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerError, serve, start_server};
pub use state::AppState;
