//! Shared type definitions for the lifegrid server.
//!
//! This crate is the single source of truth for the value types that cross
//! crate boundaries and the wire: coordinates, regions, statistics and
//! identifiers. `Cell` and `Stats` flow downstream to `TypeScript` via
//! `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`geometry`] -- [`Cell`] coordinates and [`Rectangle`] regions
//! - [`ids`] -- Type-safe UUID wrappers for connections and observers
//! - [`stats`] -- Generation, birth and death counters

pub mod geometry;
pub mod ids;
pub mod stats;

// Re-export all public types at crate root for convenience.
pub use geometry::{Cell, Rectangle};
pub use ids::{ConnectionId, ObserverId};
pub use stats::Stats;

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the client-facing types.

    #[test]
    fn export_bindings() {
        // The files are written to the `bindings/` directory relative to
        // the crate root.
        use ts_rs::TS;

        let _ = crate::geometry::Cell::export_all();
        let _ = crate::stats::Stats::export_all();
        let _ = crate::ids::ConnectionId::export_all();
        let _ = crate::ids::ObserverId::export_all();
    }
}
