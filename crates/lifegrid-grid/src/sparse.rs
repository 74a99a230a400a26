//! Hash-set backed reference engine.
//!
//! [`SparseGrid`] stores only live cells, so the plane is effectively
//! unbounded. Generations follow the B3/S23 rule: a dead cell with exactly
//! three live neighbours is born, a live cell with two or three survives,
//! everything else dies.
//!
//! Cell storage and the observer registry sit behind separate locks.
//! Observers are notified after the cell lock is released so a slow
//! observer never holds up readers.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use lifegrid_types::{Cell, ObserverId};
use tracing::trace;

use crate::engine::{GridEngine, GridEvent, GridObserver, TickOutcome};

/// Observer registry keyed by registration id.
type ObserverMap = BTreeMap<ObserverId, Arc<dyn GridObserver>>;

/// Sparse, unbounded Game of Life grid.
#[derive(Default)]
pub struct SparseGrid {
    /// Live cells.
    cells: RwLock<HashSet<Cell>>,
    /// Registered observers.
    observers: RwLock<ObserverMap>,
}

impl SparseGrid {
    /// Create an empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a grid with the given cells live and no observers.
    pub fn with_cells(cells: impl IntoIterator<Item = Cell>) -> Self {
        Self {
            cells: RwLock::new(cells.into_iter().collect()),
            observers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        read(&self.observers).len()
    }

    fn broadcast(&self, event: &GridEvent) {
        // Clone the handles so observers run without the registry lock held;
        // an observer may unregister itself from inside `notify`.
        let observers: Vec<Arc<dyn GridObserver>> = read(&self.observers).values().cloned().collect();
        for observer in observers {
            observer.notify(event);
        }
    }
}

impl std::fmt::Debug for SparseGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseGrid")
            .field("live_cells", &read(&self.cells).len())
            .field("observers", &self.observer_count())
            .finish()
    }
}

impl GridEngine for SparseGrid {
    fn set_cell(&self, cell: Cell) {
        let inserted = write(&self.cells).insert(cell);
        if inserted {
            self.broadcast(&GridEvent::SingleSet(cell));
        }
    }

    fn set_cells(&self, cells: &[Cell]) {
        let added: Vec<Cell> = {
            let mut live = write(&self.cells);
            cells.iter().copied().filter(|cell| live.insert(*cell)).collect()
        };
        if !added.is_empty() {
            self.broadcast(&GridEvent::BulkSet(added));
        }
    }

    fn clear_cell(&self, cell: Cell) {
        let removed = write(&self.cells).remove(&cell);
        if removed {
            self.broadcast(&GridEvent::SingleClear(cell));
        }
    }

    fn clear(&self) {
        write(&self.cells).clear();
    }

    fn tick(&self) -> TickOutcome {
        let outcome = {
            let mut live = write(&self.cells);
            let outcome = next_generation(&live);
            for cell in &outcome.died {
                live.remove(cell);
            }
            live.extend(outcome.born.iter().copied());
            outcome
        };

        trace!(
            born = outcome.born.len(),
            died = outcome.died.len(),
            "generation computed"
        );

        self.broadcast(&GridEvent::Tick {
            born: outcome.born.clone(),
            died: outcome.died.clone(),
        });
        outcome
    }

    fn live_cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = read(&self.cells).iter().copied().collect();
        cells.sort_unstable();
        cells
    }

    fn live_count(&self) -> usize {
        read(&self.cells).len()
    }

    fn add_observer(&self, observer: Arc<dyn GridObserver>) -> ObserverId {
        let id = ObserverId::new();
        write(&self.observers).insert(id, observer);
        id
    }

    fn remove_observer(&self, id: ObserverId) -> bool {
        write(&self.observers).remove(&id).is_some()
    }
}

/// Compute births and deaths for one generation without applying them.
fn next_generation(live: &HashSet<Cell>) -> TickOutcome {
    let mut neighbours: HashMap<Cell, u8> = HashMap::with_capacity(live.len().saturating_mul(8));
    for cell in live {
        for neighbour in cell.neighbors() {
            let count = neighbours.entry(neighbour).or_insert(0);
            *count = count.saturating_add(1);
        }
    }

    let mut born: Vec<Cell> = neighbours
        .iter()
        .filter(|(cell, count)| **count == 3 && !live.contains(*cell))
        .map(|(cell, _)| *cell)
        .collect();

    let mut died: Vec<Cell> = live
        .iter()
        .filter(|cell| !matches!(neighbours.get(*cell), Some(2 | 3)))
        .copied()
        .collect();

    born.sort_unstable();
    died.sort_unstable();
    TickOutcome { born, died }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
