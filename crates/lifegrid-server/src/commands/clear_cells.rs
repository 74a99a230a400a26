//! `clear_cells`: make each listed cell dead.

use std::sync::Arc;

use tracing::{info, warn};

use super::payload::{CellsPayload, parse_cells};
use super::reply;
use crate::connection::Connection;
use crate::error::CommandError;
use crate::protocol::OutgoingMessage;
use crate::registry::{CommandHandler, Output};

/// Handler for `clear_cells`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearCells;

impl CommandHandler for ClearCells {
    type Data = CellsPayload;

    async fn handle(&self, data: CellsPayload, conn: Arc<Connection>, out: Output) {
        let Some(cells) = parse_cells(data.cells.as_ref()) else {
            warn!(connection = %conn.id(), "invalid cells data received in clear_cells command");
            reply(&conn, &out, CommandError::InvalidCells.into()).await;
            return;
        };

        info!(connection = %conn.id(), count = cells.len(), "clearing cells");
        conn.manager()
            .mutate(|grid| {
                for cell in &cells {
                    grid.clear_cell(*cell);
                }
            })
            .await;
        reply(&conn, &out, OutgoingMessage::ok()).await;
    }
}
