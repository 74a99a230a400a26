//! Region-clipped observation.
//!
//! A [`RegionObserver`] sits between the grid's broadcast and one
//! subscriber. Every event is clipped to the observer's current bounds and
//! forwarded only if something is left.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use lifegrid_types::{Cell, Rectangle};

use crate::engine::{GridEvent, GridObserver};

/// Delivery function invoked with each clipped, non-empty event.
pub type DeliveryFn = Box<dyn Fn(GridEvent) + Send + Sync>;

/// Clips grid events to a rectangle and forwards what remains.
///
/// The bounds can be moved in place with [`set_region`](Self::set_region);
/// the new rectangle applies to every event delivered afterwards. Events
/// missed before a move are not replayed.
pub struct RegionObserver {
    bounds: RwLock<Rectangle>,
    deliver: DeliveryFn,
}

impl RegionObserver {
    /// Create an observer for `bounds` that hands clipped events to `deliver`.
    pub fn new(bounds: Rectangle, deliver: impl Fn(GridEvent) + Send + Sync + 'static) -> Self {
        Self {
            bounds: RwLock::new(bounds),
            deliver: Box::new(deliver),
        }
    }

    /// Move the observed region.
    pub fn set_region(&self, bounds: Rectangle) {
        *self.bounds.write().unwrap_or_else(PoisonError::into_inner) = bounds;
    }

    /// The currently observed region.
    pub fn bounds(&self) -> Rectangle {
        *self.bounds.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for RegionObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionObserver")
            .field("bounds", &self.bounds())
            .finish_non_exhaustive()
    }
}

impl GridObserver for RegionObserver {
    fn notify(&self, event: &GridEvent) {
        if let Some(clipped) = clip(event, &self.bounds()) {
            (self.deliver)(clipped);
        }
    }
}

/// Restrict `event` to cells inside `bounds`. `None` if nothing survives.
pub fn clip(event: &GridEvent, bounds: &Rectangle) -> Option<GridEvent> {
    let clipped = match event {
        GridEvent::BulkSet(cells) => GridEvent::BulkSet(within(cells, bounds)),
        GridEvent::SingleSet(cell) => {
            if !bounds.contains(*cell) {
                return None;
            }
            GridEvent::SingleSet(*cell)
        }
        GridEvent::SingleClear(cell) => {
            if !bounds.contains(*cell) {
                return None;
            }
            GridEvent::SingleClear(*cell)
        }
        GridEvent::Tick { born, died } => GridEvent::Tick {
            born: within(born, bounds),
            died: within(died, bounds),
        },
    };
    (!clipped.is_empty()).then_some(clipped)
}

fn within(cells: &[Cell], bounds: &Rectangle) -> Vec<Cell> {
    cells.iter().copied().filter(|cell| bounds.contains(*cell)).collect()
}
