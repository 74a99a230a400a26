//! The persisted snapshot document.

use chrono::{DateTime, Utc};
use lifegrid_types::{Cell, Stats};
use serde::{Deserialize, Serialize};

/// Format version written by this build. Files with any other version are
/// refused on load.
pub const SNAPSHOT_VERSION: u32 = 1;

/// A complete copy of grid and statistics at one point in time.
///
/// Serialized as
/// `{"version":1,"timestamp":"…","stats":{…},"grid":[[x,y],…]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Document format version.
    pub version: u32,
    /// When the snapshot was captured.
    pub timestamp: DateTime<Utc>,
    /// Counters at capture time.
    pub stats: Stats,
    /// Live cells, sorted.
    pub grid: Vec<Cell>,
}

impl Snapshot {
    /// Build a current-version snapshot stamped with the current time.
    pub fn new(stats: Stats, grid: Vec<Cell>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            timestamp: Utc::now(),
            stats,
            grid,
        }
    }

    /// Whether this build can apply the snapshot.
    pub const fn is_supported(&self) -> bool {
        self.version == SNAPSHOT_VERSION
    }
}
