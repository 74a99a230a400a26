//! Game manager: tick scheduling and the grid lock.
//!
//! [`GameManager`] owns the engine handle and decides who may touch the
//! grid when. Whole-grid operations (a generation, a snapshot restore, a
//! snapshot capture) take the exclusive side of the grid lock. Command
//! mutations of individual cells take the shared side: they may run
//! alongside each other but never in the middle of a tick or a restore.

use std::sync::Arc;
use std::time::Duration;

use lifegrid_grid::{GridEngine, TickOutcome};
use lifegrid_types::{Cell, Stats};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::snapshot::Snapshot;
use crate::stats::StatsTracker;

/// Errors from controlling the manager.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// `start` was called with a zero interval.
    #[error("tick interval must be greater than zero")]
    ZeroInterval,
}

/// Owns the grid engine and the tick loop.
pub struct GameManager {
    grid: Arc<dyn GridEngine>,
    grid_lock: RwLock<()>,
    stats: StatsTracker,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl GameManager {
    /// Wrap an engine with zeroed statistics.
    pub fn new(grid: Arc<dyn GridEngine>) -> Self {
        Self::with_stats(grid, Stats::default())
    }

    /// Wrap an engine, starting from the given statistics.
    pub fn with_stats(grid: Arc<dyn GridEngine>, stats: Stats) -> Self {
        Self {
            grid,
            grid_lock: RwLock::new(()),
            stats: StatsTracker::new(stats),
            ticker: Mutex::new(None),
        }
    }

    /// Start ticking every `interval`. Does nothing if already running.
    ///
    /// Each generation runs in its own task, so a panic inside the engine
    /// loses that generation only and the cadence carries on.
    ///
    /// # Errors
    ///
    /// Returns [`ManagerError::ZeroInterval`] for a zero interval.
    pub async fn start(self: &Arc<Self>, interval: Duration) -> Result<(), ManagerError> {
        if interval.is_zero() {
            return Err(ManagerError::ZeroInterval);
        }

        let mut ticker = self.ticker.lock().await;
        if ticker.is_some() {
            debug!("tick loop already running");
            return Ok(());
        }

        let manager = Arc::clone(self);
        *ticker = Some(tokio::spawn(async move {
            let now = Instant::now();
            let mut timer = tokio::time::interval_at(now.checked_add(interval).unwrap_or(now), interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                let manager = Arc::clone(&manager);
                if let Err(e) = tokio::spawn(async move { manager.tick().await }).await {
                    error!(error = %e, "tick task failed");
                }
            }
        }));

        info!(interval_ms = interval.as_millis(), "tick loop started");
        Ok(())
    }

    /// Stop ticking. Does nothing if not running.
    pub async fn stop(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
            info!("tick loop stopped");
        }
    }

    /// Whether the tick loop is active.
    pub async fn is_running(&self) -> bool {
        self.ticker.lock().await.is_some()
    }

    /// Advance one generation under the exclusive grid lock.
    ///
    /// Observers are notified from inside the engine while the lock is
    /// held, once the generation is complete.
    pub async fn tick(&self) -> TickOutcome {
        let _guard = self.grid_lock.write().await;
        let outcome = self.grid.tick();
        let stats = self
            .stats
            .record_tick(outcome.born.len(), outcome.died.len())
            .await;
        debug!(
            generation = stats.generation,
            born = outcome.born.len(),
            died = outcome.died.len(),
            "tick"
        );
        outcome
    }

    /// Point-in-time copy of the statistics.
    pub async fn stats(&self) -> Stats {
        self.stats.snapshot().await
    }

    /// The engine handle, for reads.
    pub fn grid(&self) -> &Arc<dyn GridEngine> {
        &self.grid
    }

    /// Run a cell-level mutation under the shared side of the grid lock.
    pub async fn mutate<R>(&self, f: impl FnOnce(&dyn GridEngine) -> R) -> R {
        let _guard = self.grid_lock.read().await;
        f(self.grid.as_ref())
    }

    /// Replace statistics and the entire grid contents in one step.
    ///
    /// Observers see one `bulk-set` with the new cells; the clear is silent.
    pub async fn replace_state(&self, stats: Stats, cells: &[Cell]) {
        let _guard = self.grid_lock.write().await;
        self.stats.replace(stats).await;
        self.grid.clear();
        self.grid.set_cells(cells);
    }

    /// Capture statistics and live cells from the same generation.
    pub async fn capture(&self) -> Snapshot {
        let _guard = self.grid_lock.write().await;
        let stats = self.stats.snapshot().await;
        Snapshot::new(stats, self.grid.live_cells())
    }
}

impl std::fmt::Debug for GameManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameManager")
            .field("live_cells", &self.grid.live_count())
            .finish_non_exhaustive()
    }
}
