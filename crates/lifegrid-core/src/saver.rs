//! Periodic snapshot persistence and startup restore.
//!
//! [`SnapshotManager`] captures the game state on a timer, writes it to a
//! timestamped JSON file, and prunes the save directory down to the
//! configured number of files. On startup [`SnapshotManager::load_latest`]
//! restores the newest file by modification time.
//!
//! Files are named `save_YYYYMMDD_HHMMSS.json` (UTC). Only names of that
//! shape are listed, loaded, or pruned; anything else in the directory is
//! left alone.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::PersistenceConfig;
use crate::manager::GameManager;
use crate::snapshot::{SNAPSHOT_VERSION, Snapshot};

const FILE_PREFIX: &str = "save_";
const FILE_SUFFIX: &str = ".json";

/// Errors from writing, reading, or pruning snapshot files.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// A filesystem operation failed.
    #[error("snapshot I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A snapshot could not be encoded or decoded.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The file was written by an incompatible format version.
    #[error("unsupported snapshot version {found} (expected {expected})", expected = SNAPSHOT_VERSION)]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
    },
}

impl SnapshotError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Saves and restores the game manager's state.
pub struct SnapshotManager {
    manager: Arc<GameManager>,
    config: PersistenceConfig,
    saver: Mutex<Option<JoinHandle<()>>>,
}

impl SnapshotManager {
    /// Create a snapshot manager for `manager` using `config`.
    pub fn new(manager: Arc<GameManager>, config: PersistenceConfig) -> Self {
        Self {
            manager,
            config,
            saver: Mutex::new(None),
        }
    }

    /// Whether periodic saving is configured at all.
    pub const fn is_enabled(&self) -> bool {
        self.config.save_interval_secs > 0
    }

    /// Directory snapshots are written to.
    pub fn save_dir(&self) -> &Path {
        &self.config.save_dir
    }

    /// Start the save timer.
    ///
    /// Does nothing when the configured interval is zero or negative, or
    /// when the timer is already running. The first save happens one full
    /// interval after this call.
    pub async fn start_saving(self: &Arc<Self>) {
        let Ok(secs) = u64::try_from(self.config.save_interval_secs) else {
            info!("periodic saving disabled");
            return;
        };
        if secs == 0 {
            info!("periodic saving disabled");
            return;
        }

        let mut saver = self.saver.lock().await;
        if saver.is_some() {
            return;
        }

        let period = Duration::from_secs(secs);
        let this = Arc::clone(self);
        *saver = Some(tokio::spawn(async move {
            let now = Instant::now();
            let mut timer = tokio::time::interval_at(now.checked_add(period).unwrap_or(now), period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                if let Err(e) = this.save_now().await {
                    error!(error = %e, "failed to save game state");
                }
            }
        }));

        info!(
            interval_secs = secs,
            dir = %self.config.save_dir.display(),
            max_files = self.config.max_save_files,
            "periodic saving started"
        );
    }

    /// Stop the save timer. Does nothing if it is not running.
    pub async fn stop_saving(&self) {
        if let Some(handle) = self.saver.lock().await.take() {
            handle.abort();
            info!("periodic saving stopped");
        }
    }

    /// Whether the save timer is running.
    pub async fn is_saving(&self) -> bool {
        self.saver.lock().await.is_some()
    }

    /// Capture, write, and prune once.
    ///
    /// A failed prune is logged and does not fail the save.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the snapshot could not be written; no
    /// pruning happens in that case.
    pub async fn save_now(&self) -> Result<PathBuf, SnapshotError> {
        let snapshot = self.manager.capture().await;
        let path = write_snapshot(&self.config.save_dir, &snapshot).await?;
        info!(
            file = %path.display(),
            generation = snapshot.stats.generation,
            cells = snapshot.grid.len(),
            "game state saved"
        );

        match prune(&self.config.save_dir, self.config.max_save_files).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "old save files removed"),
            Err(e) => warn!(error = %e, "failed to clean up old save files"),
        }
        Ok(path)
    }

    /// Restore the newest snapshot in the save directory.
    ///
    /// Returns `Ok(false)` when there is nothing to restore (missing or
    /// empty directory). The grid and stats are replaced only after the
    /// file has been read and validated in full.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] if the newest file cannot be read, is not a
    /// valid snapshot, or has an unsupported version.
    pub async fn load_latest(&self) -> Result<bool, SnapshotError> {
        let Some(path) = latest(&self.config.save_dir).await? else {
            info!(dir = %self.config.save_dir.display(), "no save file found to load");
            return Ok(false);
        };

        let snapshot = read_snapshot(&path).await?;
        self.manager
            .replace_state(snapshot.stats, &snapshot.grid)
            .await;

        info!(
            file = %path.display(),
            timestamp = %snapshot.timestamp,
            generation = snapshot.stats.generation,
            cells = snapshot.grid.len(),
            "game state loaded from snapshot"
        );
        Ok(true)
    }
}

impl std::fmt::Debug for SnapshotManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Save directory operations
// ---------------------------------------------------------------------------

/// File name for a snapshot taken at `snapshot.timestamp`.
pub fn snapshot_file_name(snapshot: &Snapshot) -> String {
    format!(
        "{FILE_PREFIX}{}{FILE_SUFFIX}",
        snapshot.timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// Whether `name` looks like a snapshot file.
pub fn is_snapshot_file_name(name: &str) -> bool {
    name.len() > FILE_PREFIX.len().saturating_add(FILE_SUFFIX.len())
        && name.starts_with(FILE_PREFIX)
        && name.ends_with(FILE_SUFFIX)
}

/// Write `snapshot` into `dir`, creating the directory if needed.
///
/// The document goes to a hidden temp file first and is renamed into
/// place, so readers never observe a half-written snapshot.
///
/// # Errors
///
/// Returns [`SnapshotError`] on any encode or filesystem failure.
pub async fn write_snapshot(dir: &Path, snapshot: &Snapshot) -> Result<PathBuf, SnapshotError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| SnapshotError::io(dir, e))?;

    let name = snapshot_file_name(snapshot);
    let path = dir.join(&name);
    let tmp = dir.join(format!(".{name}.tmp"));

    let body = serde_json::to_vec_pretty(snapshot)?;
    tokio::fs::write(&tmp, body)
        .await
        .map_err(|e| SnapshotError::io(&tmp, e))?;
    if let Err(e) = tokio::fs::rename(&tmp, &path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(SnapshotError::io(&path, e));
    }
    Ok(path)
}

/// Read and validate one snapshot file.
///
/// # Errors
///
/// Returns [`SnapshotError`] if the file is unreadable, malformed, or of an
/// unsupported version.
pub async fn read_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let body = tokio::fs::read(path)
        .await
        .map_err(|e| SnapshotError::io(path, e))?;
    let snapshot: Snapshot = serde_json::from_slice(&body)?;
    if !snapshot.is_supported() {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
        });
    }
    Ok(snapshot)
}

/// Snapshot files in `dir` with their modification times, oldest first.
///
/// A missing directory yields an empty list.
///
/// # Errors
///
/// Returns [`SnapshotError::Io`] if the directory cannot be read.
pub async fn list_snapshots(dir: &Path) -> Result<Vec<(PathBuf, SystemTime)>, SnapshotError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SnapshotError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| SnapshotError::io(dir, e))?
    {
        let name = entry.file_name();
        if !name.to_str().is_some_and(is_snapshot_file_name) {
            continue;
        }
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => continue,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "skipping unreadable save file");
                continue;
            }
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((path, modified));
    }

    files.sort_by(|(a_path, a_time), (b_path, b_time)| {
        a_time.cmp(b_time).then_with(|| a_path.cmp(b_path))
    });
    Ok(files)
}

/// The most recently modified snapshot file in `dir`, if any.
///
/// # Errors
///
/// Returns [`SnapshotError::Io`] if the directory cannot be read.
pub async fn latest(dir: &Path) -> Result<Option<PathBuf>, SnapshotError> {
    Ok(list_snapshots(dir).await?.pop().map(|(path, _)| path))
}

/// Delete the oldest snapshot files until at most `keep` remain.
///
/// `keep == 0` keeps everything. Returns how many files were removed.
///
/// # Errors
///
/// Returns [`SnapshotError::Io`] on the first listing or delete failure.
pub async fn prune(dir: &Path, keep: usize) -> Result<usize, SnapshotError> {
    if keep == 0 {
        return Ok(0);
    }
    let files = list_snapshots(dir).await?;
    let excess = files.len().saturating_sub(keep);
    for (path, _) in files.iter().take(excess) {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| SnapshotError::io(path, e))?;
        debug!(file = %path.display(), "removed old save file");
    }
    Ok(excess)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lifegrid_types::{Cell, Stats};

    use super::*;

    #[test]
    fn file_names() {
        let mut snapshot = Snapshot::new(Stats::default(), Vec::new());
        snapshot.timestamp = chrono::DateTime::parse_from_rfc3339("2025-03-09T07:05:01Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let name = snapshot_file_name(&snapshot);
        assert_eq!(name, "save_20250309_070501.json");
        assert!(is_snapshot_file_name(&name));
        assert!(!is_snapshot_file_name("save_.json"));
        assert!(!is_snapshot_file_name(".save_20250309_070501.json.tmp"));
        assert!(!is_snapshot_file_name("notes.json"));
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("saves");
        let snapshot = Snapshot::new(
            Stats {
                generation: 9,
                birth_count: 1,
                death_count: 2,
            },
            vec![Cell::new(-3, 4)],
        );

        let path = write_snapshot(&nested, &snapshot).await.unwrap();
        assert_eq!(read_snapshot(&path).await.unwrap(), snapshot);

        let listed = list_snapshots(&nested).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn missing_directory_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(list_snapshots(&missing).await.unwrap().is_empty());
        assert!(latest(&missing).await.unwrap().is_none());
        assert_eq!(prune(&missing, 3).await.unwrap(), 0);
    }
}
