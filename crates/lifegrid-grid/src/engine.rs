//! The grid engine contract.
//!
//! Everything above this crate talks to the cellular automaton only
//! through [`GridEngine`], so the storage strategy (sparse set, dense
//! array, ...) can change without touching the server.

use std::sync::Arc;

use lifegrid_types::{Cell, ObserverId};

/// A change notification pushed to every registered observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridEvent {
    /// A batch of cells became live in one operation.
    BulkSet(Vec<Cell>),
    /// One cell became live.
    SingleSet(Cell),
    /// One cell was cleared.
    SingleClear(Cell),
    /// A generation was computed.
    Tick {
        /// Cells that came alive this generation.
        born: Vec<Cell>,
        /// Cells that died this generation.
        died: Vec<Cell>,
    },
}

impl GridEvent {
    /// Wire tag for the event kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BulkSet(_) => "bulk-set",
            Self::SingleSet(_) => "single-set",
            Self::SingleClear(_) => "single-clear",
            Self::Tick { .. } => "tick",
        }
    }

    /// Whether the event carries no cells at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::BulkSet(cells) => cells.is_empty(),
            Self::SingleSet(_) | Self::SingleClear(_) => false,
            Self::Tick { born, died } => born.is_empty() && died.is_empty(),
        }
    }
}

/// Cells that changed state during one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// Newly live cells, sorted.
    pub born: Vec<Cell>,
    /// Newly dead cells, sorted.
    pub died: Vec<Cell>,
}

/// Receives grid change notifications.
///
/// Called synchronously from inside the mutating operation, possibly from
/// the tick task. Implementations must not block.
pub trait GridObserver: Send + Sync {
    /// Handle one change notification.
    fn notify(&self, event: &GridEvent);
}

/// The operations the server needs from a cellular automaton.
///
/// Every method takes `&self`: implementations synchronize internally so
/// that each individual call is atomic with respect to the others.
/// Coordinating *sequences* of calls (clear-then-repopulate, tick versus
/// command mutation) is the caller's job.
pub trait GridEngine: Send + Sync {
    /// Make `cell` live. Emits [`GridEvent::SingleSet`] if it was dead.
    fn set_cell(&self, cell: Cell);

    /// Make every cell in `cells` live. Emits one [`GridEvent::BulkSet`]
    /// listing the cells that were not already live.
    fn set_cells(&self, cells: &[Cell]);

    /// Make `cell` dead. Emits [`GridEvent::SingleClear`] if it was live.
    fn clear_cell(&self, cell: Cell);

    /// Remove every live cell without notifying observers.
    fn clear(&self);

    /// Advance one generation and emit [`GridEvent::Tick`].
    fn tick(&self) -> TickOutcome;

    /// All live cells, sorted by `x` then `y`.
    fn live_cells(&self) -> Vec<Cell>;

    /// Number of live cells.
    fn live_count(&self) -> usize;

    /// Register an observer and return the id used to remove it.
    fn add_observer(&self, observer: Arc<dyn GridObserver>) -> ObserverId;

    /// Unregister an observer. Returns `false` if the id was unknown.
    fn remove_observer(&self, id: ObserverId) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_wire_tags() {
        assert_eq!(GridEvent::BulkSet(Vec::new()).kind(), "bulk-set");
        assert_eq!(GridEvent::SingleSet(Cell::new(0, 0)).kind(), "single-set");
        assert_eq!(GridEvent::SingleClear(Cell::new(0, 0)).kind(), "single-clear");
        let tick = GridEvent::Tick {
            born: Vec::new(),
            died: Vec::new(),
        };
        assert_eq!(tick.kind(), "tick");
        assert!(tick.is_empty());
    }
}
