//! Cellular automaton engine for the lifegrid server.
//!
//! - [`engine`] -- the [`GridEngine`] contract and the events it emits
//! - [`sparse`] -- [`SparseGrid`], an unbounded hash-set engine
//! - [`region`] -- [`RegionObserver`], which clips events to a rectangle

pub mod engine;
pub mod region;
pub mod sparse;

pub use engine::{GridEngine, GridEvent, GridObserver, TickOutcome};
pub use region::RegionObserver;
pub use sparse::SparseGrid;
