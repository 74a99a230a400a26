//! Simulation statistics.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Running counters for the simulation.
///
/// Advanced once per tick and replaced wholesale when a snapshot is
/// restored. The same snake_case shape is used in `sync_ok` replies and in
/// snapshot files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Stats {
    /// Number of generations computed so far.
    #[ts(type = "number")]
    pub generation: u64,
    /// Total cells born across all ticks.
    #[ts(type = "number")]
    pub birth_count: u64,
    /// Total cells that died across all ticks.
    #[ts(type = "number")]
    pub death_count: u64,
}

impl Stats {
    /// Account for one completed tick.
    ///
    /// Counters saturate instead of wrapping.
    pub fn record_tick(&mut self, born: usize, died: usize) {
        self.generation = self.generation.saturating_add(1);
        self.birth_count = self
            .birth_count
            .saturating_add(u64::try_from(born).unwrap_or(u64::MAX));
        self.death_count = self
            .death_count
            .saturating_add(u64::try_from(died).unwrap_or(u64::MAX));
    }
}
