//! `unobserve`: drop the connection's region subscription.

use std::sync::Arc;

use tracing::{info, warn};

use super::payload::EmptyPayload;
use super::reply;
use crate::connection::Connection;
use crate::error::CommandError;
use crate::protocol::OutgoingMessage;
use crate::registry::{CommandHandler, Output};

/// Handler for `unobserve`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unobserve;

impl CommandHandler for Unobserve {
    type Data = EmptyPayload;

    async fn handle(&self, _data: EmptyPayload, conn: Arc<Connection>, out: Output) {
        if !conn.unobserve() {
            warn!(connection = %conn.id(), "unobserve received but client is not observing any grid");
            reply(&conn, &out, CommandError::NotObserving.into()).await;
            return;
        }
        info!(connection = %conn.id(), "client stopped observing grid");
        reply(&conn, &out, OutgoingMessage::ok()).await;
    }
}
