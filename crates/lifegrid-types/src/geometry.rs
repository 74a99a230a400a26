//! Grid coordinates and axis-aligned regions.
//!
//! Both types serialize to the compact array shapes used on the wire and
//! in snapshot files: a [`Cell`] is `[x, y]` and a [`Rectangle`] is
//! `[[minX, minY], [maxX, maxY]]`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A single grid coordinate `(x, y)`.
///
/// Identity and equality are by value. Ordering is by `x`, then `y`,
/// which gives deterministic output when cell sets are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Cell(pub i32, pub i32);

impl Cell {
    /// Create a cell at `(x, y)`.
    pub const fn new(x: i32, y: i32) -> Self {
        Self(x, y)
    }

    /// Horizontal coordinate.
    pub const fn x(self) -> i32 {
        self.0
    }

    /// Vertical coordinate.
    pub const fn y(self) -> i32 {
        self.1
    }

    /// The eight surrounding cells.
    ///
    /// Neighbours that would fall outside the `i32` coordinate space are
    /// omitted, so cells on the extreme edge simply have fewer neighbours.
    pub fn neighbors(self) -> impl Iterator<Item = Self> {
        const OFFSETS: [(i32, i32); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        OFFSETS.into_iter().filter_map(move |(dx, dy)| {
            let x = self.0.checked_add(dx)?;
            let y = self.1.checked_add(dy)?;
            Some(Self(x, y))
        })
    }
}

impl From<[i32; 2]> for Cell {
    fn from([x, y]: [i32; 2]) -> Self {
        Self(x, y)
    }
}

impl From<Cell> for [i32; 2] {
    fn from(cell: Cell) -> Self {
        [cell.0, cell.1]
    }
}

/// An axis-aligned region described by two corners.
///
/// Width and height are `max - min` on each axis. A region is only usable
/// for observation when both are strictly positive; that check belongs to
/// the command layer, not to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[Cell; 2]", into = "[Cell; 2]")]
pub struct Rectangle {
    /// Minimum corner.
    pub min: Cell,
    /// Maximum corner.
    pub max: Cell,
}

impl Rectangle {
    /// Create a rectangle from its corner coordinates.
    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min: Cell(min_x, min_y),
            max: Cell(max_x, max_y),
        }
    }

    /// `max.x - min.x`, computed in 64 bits so it cannot overflow.
    pub fn width(&self) -> i64 {
        i64::from(self.max.0).saturating_sub(i64::from(self.min.0))
    }

    /// `max.y - min.y`, computed in 64 bits so it cannot overflow.
    pub fn height(&self) -> i64 {
        i64::from(self.max.1).saturating_sub(i64::from(self.min.1))
    }

    /// Euclidean length of the diagonal, `hypot(width, height)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn diagonal(&self) -> f64 {
        // Spans of i32 coordinates fit in 33 bits, well inside f64 precision.
        (self.width() as f64).hypot(self.height() as f64)
    }

    /// Whether `cell` lies inside the region, inclusive on both axes.
    pub const fn contains(&self, cell: Cell) -> bool {
        cell.0 >= self.min.0 && cell.0 <= self.max.0 && cell.1 >= self.min.1 && cell.1 <= self.max.1
    }

    /// Whether every corner coordinate is zero.
    ///
    /// The bounds parser treats this as "no bounds supplied" rather than a
    /// degenerate rectangle at the origin.
    pub const fn is_origin_sentinel(&self) -> bool {
        self.min.0 == 0 && self.min.1 == 0 && self.max.0 == 0 && self.max.1 == 0
    }
}

impl From<[Cell; 2]> for Rectangle {
    fn from([min, max]: [Cell; 2]) -> Self {
        Self { min, max }
    }
}

impl From<Rectangle> for [Cell; 2] {
    fn from(rect: Rectangle) -> Self {
        [rect.min, rect.max]
    }
}
