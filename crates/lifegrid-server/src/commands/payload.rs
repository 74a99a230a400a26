//! Lenient decoding of `cells` and `bounds` payload fields.
//!
//! Both fields are read from raw JSON rather than a strict serde shape:
//! malformed cell entries are skipped instead of failing the whole list,
//! and numbers are truncated toward zero.

use lifegrid_types::{Cell, Rectangle};
use serde::Deserialize;
use serde_json::Value;

/// Payload of `set_cells` and `clear_cells`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CellsPayload {
    /// `[[x, y], ...]`.
    #[serde(default)]
    pub cells: Option<Value>,
}

/// Payload of `sync` and `observe`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoundsPayload {
    /// `[[minX, minY], [maxX, maxY]]`.
    #[serde(default)]
    pub bounds: Option<Value>,
}

/// Payload of commands that take no data.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EmptyPayload {}

/// Collect every well-formed `[x, y]` entry.
///
/// Returns `None` if the value is missing, is not an array, or contains no
/// usable entry.
pub fn parse_cells(value: Option<&Value>) -> Option<Vec<Cell>> {
    let cells: Vec<Cell> = value?.as_array()?.iter().filter_map(parse_pair).collect();
    (!cells.is_empty()).then_some(cells)
}

/// Read a rectangle.
///
/// Returns `None` unless the value is exactly two arrays of exactly two
/// numbers each. The all-zero rectangle counts as absent.
pub fn parse_bounds(value: Option<&Value>) -> Option<Rectangle> {
    let [min, max] = value?.as_array()?.as_slice() else {
        return None;
    };
    let rect = Rectangle {
        min: parse_pair(min)?,
        max: parse_pair(max)?,
    };
    (!rect.is_origin_sentinel()).then_some(rect)
}

fn parse_pair(value: &Value) -> Option<Cell> {
    let [x, y] = value.as_array()?.as_slice() else {
        return None;
    };
    Some(Cell::new(coordinate(x)?, coordinate(y)?))
}

/// A JSON number as an `i32`, truncated toward zero.
fn coordinate(value: &Value) -> Option<i32> {
    if let Some(n) = value.as_i64() {
        return i32::try_from(n).ok();
    }
    let n = value.as_f64()?.trunc();
    if !n.is_finite() || n < f64::from(i32::MIN) || n > f64::from(i32::MAX) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    Some(n as i32)
}
