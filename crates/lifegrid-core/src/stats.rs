//! Concurrency-safe statistics counters.

use lifegrid_types::Stats;
use tokio::sync::Mutex;

/// Shared [`Stats`] behind its own lock, independent of the grid lock.
#[derive(Debug, Default)]
pub struct StatsTracker {
    inner: Mutex<Stats>,
}

impl StatsTracker {
    /// Start from the given counters.
    pub fn new(initial: Stats) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    /// Point-in-time copy of the counters.
    pub async fn snapshot(&self) -> Stats {
        *self.inner.lock().await
    }

    /// Advance the generation and accumulate births and deaths.
    pub async fn record_tick(&self, born: usize, died: usize) -> Stats {
        let mut stats = self.inner.lock().await;
        stats.record_tick(born, died);
        *stats
    }

    /// Replace every counter, e.g. after a snapshot load.
    pub async fn replace(&self, stats: Stats) {
        *self.inner.lock().await = stats;
    }
}
