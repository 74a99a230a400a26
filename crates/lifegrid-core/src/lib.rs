//! Game orchestration for the lifegrid server.
//!
//! This crate owns everything between the grid engine and the network:
//! configuration, the tick loop and grid lock, and snapshot persistence.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `lifegrid-config.yaml` plus
//!   environment overrides.
//! - [`manager`] -- [`GameManager`]: tick scheduling and the grid lock.
//! - [`saver`] -- [`SnapshotManager`]: periodic saves, pruning, restore.
//! - [`snapshot`] -- The persisted [`Snapshot`] document.
//! - [`stats`] -- [`StatsTracker`], the shared counters.
//!
//! [`GameManager`]: manager::GameManager
//! [`SnapshotManager`]: saver::SnapshotManager
//! [`Snapshot`]: snapshot::Snapshot
//! [`StatsTracker`]: stats::StatsTracker

pub mod config;
pub mod manager;
pub mod saver;
pub mod snapshot;
pub mod stats;
