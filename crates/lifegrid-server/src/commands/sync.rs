//! `sync`: send the full live-cell set and current stats.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::payload::{BoundsPayload, parse_bounds};
use super::reply;
use crate::connection::Connection;
use crate::error::CommandError;
use crate::protocol::{Code, OutgoingMessage, cells_value};
use crate::registry::{CommandHandler, Output};

/// Handler for `sync`.
///
/// The bounds are required and echoed back, but every live cell is
/// returned regardless of them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncGrid;

impl CommandHandler for SyncGrid {
    type Data = BoundsPayload;

    async fn handle(&self, data: BoundsPayload, conn: Arc<Connection>, out: Output) {
        let Some(bounds) = parse_bounds(data.bounds.as_ref()) else {
            warn!(connection = %conn.id(), "sync command received without valid bounds data");
            reply(&conn, &out, CommandError::BoundsNotProvided.into()).await;
            return;
        };

        let manager = conn.manager();
        let cells = manager.grid().live_cells();
        let stats = manager.stats().await;
        debug!(connection = %conn.id(), live_cells = cells.len(), "syncing grid state");

        let message = OutgoingMessage::new(Code::SyncOk)
            .with("bounds", serde_json::to_value(bounds).unwrap_or(Value::Null))
            .with("cells", cells_value(&cells))
            .with("stats", serde_json::to_value(stats).unwrap_or(Value::Null));
        reply(&conn, &out, message).await;
    }
}
