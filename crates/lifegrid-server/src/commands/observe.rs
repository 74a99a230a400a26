//! `observe`: subscribe to region diffs, or move the current region.

use std::sync::Arc;

use lifegrid_types::Rectangle;
use serde_json::Value;
use tracing::{debug, warn};

use super::payload::{BoundsPayload, parse_bounds};
use super::reply;
use crate::connection::{Connection, ObserveOutcome};
use crate::error::CommandError;
use crate::protocol::{Code, OutgoingMessage};
use crate::registry::{CommandHandler, Output};

/// Handler for `observe`.
#[derive(Debug, Clone, Copy)]
pub struct Observe {
    /// Largest diagonal a region may have.
    pub max_region_size: u32,
}

impl Observe {
    /// Validate in order: shape, positive size, diagonal. Nothing is
    /// changed when a check fails.
    fn validate(&self, data: &BoundsPayload) -> Result<Rectangle, CommandError> {
        let bounds = parse_bounds(data.bounds.as_ref()).ok_or(CommandError::InvalidBounds)?;
        if bounds.width() <= 0 || bounds.height() <= 0 {
            return Err(CommandError::NonPositiveBounds);
        }
        if bounds.diagonal() > f64::from(self.max_region_size) {
            return Err(CommandError::RegionTooLarge {
                max: self.max_region_size,
            });
        }
        Ok(bounds)
    }
}

impl CommandHandler for Observe {
    type Data = BoundsPayload;

    async fn handle(&self, data: BoundsPayload, conn: Arc<Connection>, out: Output) {
        let bounds = match self.validate(&data) {
            Ok(bounds) => bounds,
            Err(e) => {
                warn!(connection = %conn.id(), error = %e, "observe rejected");
                reply(&conn, &out, e.into()).await;
                return;
            }
        };

        // Acknowledge before registering so no region event can overtake
        // the reply on this channel.
        let ack = OutgoingMessage::new(Code::ObserveOk)
            .with("bounds", serde_json::to_value(bounds).unwrap_or(Value::Null));
        if !reply(&conn, &out, ack).await {
            return;
        }

        let outcome = conn.observe(bounds, &out);
        debug!(
            connection = %conn.id(),
            width = bounds.width(),
            height = bounds.height(),
            created = outcome == ObserveOutcome::Created,
            "region observer set"
        );
    }
}
