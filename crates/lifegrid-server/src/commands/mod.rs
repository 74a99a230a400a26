//! Built-in commands.
//!
//! | command | payload | reply |
//! |---|---|---|
//! | `set_cells` | `cells` | `ok` |
//! | `clear_cells` | `cells` | `ok` |
//! | `sync` | `bounds` | `sync_ok` with `bounds`, `cells`, `stats` |
//! | `observe` | `bounds` | `observe_ok` with `bounds`, then `observe_event` pushes |
//! | `unobserve` | none | `ok` |

pub mod clear_cells;
pub mod observe;
pub mod payload;
pub mod set_cells;
pub mod sync;
pub mod unobserve;

use tracing::debug;

use crate::connection::Connection;
use crate::protocol::OutgoingMessage;
use crate::registry::{CommandRegistry, Output};

/// Register every built-in command.
pub fn register_defaults(registry: &mut CommandRegistry, max_region_size: u32) {
    registry.register("set_cells", set_cells::SetCells);
    registry.register("clear_cells", clear_cells::ClearCells);
    registry.register("sync", sync::SyncGrid);
    registry.register("observe", observe::Observe { max_region_size });
    registry.register("unobserve", unobserve::Unobserve);
}

/// Send `message` on a command's output. Returns `false` once the
/// dispatcher has stopped listening, which only happens after a failed
/// socket write.
async fn reply(conn: &Connection, out: &Output, message: OutgoingMessage) -> bool {
    if out.send(message).await.is_err() {
        debug!(connection = %conn.id(), "reply dropped, output closed");
        return false;
    }
    true
}
