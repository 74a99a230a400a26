//! Integration tests for snapshot saving, pruning, and restore.

#![allow(clippy::unwrap_used)]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use lifegrid_core::config::PersistenceConfig;
use lifegrid_core::manager::GameManager;
use lifegrid_core::saver::{self, SnapshotError, SnapshotManager};
use lifegrid_grid::{GridEngine, SparseGrid};
use lifegrid_types::{Cell, Stats};

fn persistence(dir: &Path, interval: i64, keep: usize) -> PersistenceConfig {
    PersistenceConfig {
        save_interval_secs: interval,
        save_dir: dir.to_path_buf(),
        max_save_files: keep,
    }
}

fn manager_with(cells: &[Cell]) -> Arc<GameManager> {
    let grid = SparseGrid::with_cells(cells.iter().copied());
    Arc::new(GameManager::new(Arc::new(grid)))
}

/// Write a snapshot-shaped file with an explicit modification time.
fn write_aged(dir: &Path, name: &str, generation: u64, age_secs: u64) {
    let path = dir.join(name);
    let body = format!(
        r#"{{"version":1,"timestamp":"2024-01-01T00:00:00Z","stats":{{"generation":{generation},"birth_count":0,"death_count":0}},"grid":[[{generation},0]]}}"#
    );
    std::fs::write(&path, body).unwrap();
    let mtime = SystemTime::now() - Duration::from_secs(age_secs);
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}

#[tokio::test]
async fn round_trip_restores_cells_and_stats() {
    let dir = tempfile::tempdir().unwrap();
    let source = manager_with(&[Cell::new(0, -1), Cell::new(0, 0), Cell::new(0, 1)]);
    source.tick().await;
    source.tick().await;
    source.tick().await;

    let saver = SnapshotManager::new(Arc::clone(&source), persistence(dir.path(), 60, 10));
    saver.save_now().await.unwrap();

    let target = manager_with(&[Cell::new(100, 100)]);
    let loader = SnapshotManager::new(Arc::clone(&target), persistence(dir.path(), 60, 10));
    assert!(loader.load_latest().await.unwrap());

    assert_eq!(target.stats().await, source.stats().await);
    assert_eq!(target.grid().live_cells(), source.grid().live_cells());
}

#[tokio::test]
async fn load_latest_on_empty_directory_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let manager = manager_with(&[Cell::new(1, 1)]);
    let saver = SnapshotManager::new(Arc::clone(&manager), persistence(dir.path(), 60, 10));

    assert!(!saver.load_latest().await.unwrap());
    assert_eq!(manager.grid().live_cells(), vec![Cell::new(1, 1)]);
}

#[tokio::test]
async fn load_latest_picks_newest_by_mtime() {
    let dir = tempfile::tempdir().unwrap();
    // Name order and mtime order disagree on purpose.
    write_aged(dir.path(), "save_20200101_000000.json", 7, 10);
    write_aged(dir.path(), "save_20990101_000000.json", 3, 500);
    std::fs::write(dir.path().join("readme.txt"), "not a save").unwrap();

    let manager = manager_with(&[]);
    let saver = SnapshotManager::new(Arc::clone(&manager), persistence(dir.path(), 60, 10));
    assert!(saver.load_latest().await.unwrap());

    assert_eq!(manager.stats().await.generation, 7);
    assert_eq!(manager.grid().live_cells(), vec![Cell::new(7, 0)]);
}

#[tokio::test]
async fn unsupported_version_is_rejected_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("save_20240101_000000.json"),
        r#"{"version":2,"timestamp":"2024-01-01T00:00:00Z","stats":{"generation":5,"birth_count":0,"death_count":0},"grid":[]}"#,
    )
    .unwrap();

    let manager = manager_with(&[Cell::new(4, 4)]);
    let saver = SnapshotManager::new(Arc::clone(&manager), persistence(dir.path(), 60, 10));
    let err = saver.load_latest().await.unwrap_err();

    assert!(matches!(err, SnapshotError::UnsupportedVersion { found: 2 }));
    assert_eq!(manager.grid().live_cells(), vec![Cell::new(4, 4)]);
    assert_eq!(manager.stats().await, Stats::default());
}

#[tokio::test]
async fn corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("save_20240101_000000.json"), "{ nope").unwrap();

    let manager = manager_with(&[]);
    let saver = SnapshotManager::new(manager, persistence(dir.path(), 60, 10));
    assert!(matches!(
        saver.load_latest().await,
        Err(SnapshotError::Serialization(_))
    ));
}

#[tokio::test]
async fn prune_removes_exactly_the_oldest() {
    let dir = tempfile::tempdir().unwrap();
    for (i, age) in [50_u64, 10, 40, 20, 30].into_iter().enumerate() {
        write_aged(dir.path(), &format!("save_2024010{i}_000000.json"), 0, age);
    }
    std::fs::write(dir.path().join("keep-me.json"), "{}").unwrap();

    let removed = saver::prune(dir.path(), 2).await.unwrap();
    assert_eq!(removed, 3);

    let mut left: Vec<String> = saver::list_snapshots(dir.path())
        .await
        .unwrap()
        .into_iter()
        .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    left.sort();
    // Ages 10 and 20 are the two newest.
    assert_eq!(
        left,
        vec!["save_20240101_000000.json", "save_20240103_000000.json"]
    );
    assert!(dir.path().join("keep-me.json").exists());
}

#[tokio::test]
async fn prune_with_zero_keeps_everything() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..4_u64 {
        write_aged(dir.path(), &format!("save_2024010{i}_000000.json"), 0, i);
    }
    assert_eq!(saver::prune(dir.path(), 0).await.unwrap(), 0);
    assert_eq!(saver::list_snapshots(dir.path()).await.unwrap().len(), 4);
}

#[tokio::test]
async fn save_now_prunes_after_writing() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..3_u64 {
        write_aged(dir.path(), &format!("save_2000010{i}_000000.json"), 0, 100 + i);
    }

    let manager = manager_with(&[Cell::new(2, 2)]);
    let saver = SnapshotManager::new(manager, persistence(dir.path(), 60, 2));
    let written = saver.save_now().await.unwrap();

    let listed = saver::list_snapshots(dir.path()).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|(path, _)| *path == written));
}

#[tokio::test]
async fn non_positive_interval_never_starts() {
    let dir = tempfile::tempdir().unwrap();
    for interval in [0, -5] {
        let saver = Arc::new(SnapshotManager::new(
            manager_with(&[]),
            persistence(dir.path(), interval, 10),
        ));
        assert!(!saver.is_enabled());
        saver.start_saving().await;
        assert!(!saver.is_saving().await);
    }
}

#[tokio::test]
async fn timer_saves_after_each_interval() {
    let dir = tempfile::tempdir().unwrap();
    let saver = Arc::new(SnapshotManager::new(
        manager_with(&[Cell::new(0, 0)]),
        persistence(dir.path(), 1, 10),
    ));

    saver.start_saving().await;
    saver.start_saving().await;
    assert!(saver.is_saving().await);
    assert!(saver::list_snapshots(dir.path()).await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(1_600)).await;
    saver.stop_saving().await;
    assert!(!saver.is_saving().await);

    let saved = saver::list_snapshots(dir.path()).await.unwrap();
    assert!(!saved.is_empty());
    let snapshot = saver::read_snapshot(&saved.last().unwrap().0).await.unwrap();
    assert_eq!(snapshot.grid, vec![Cell::new(0, 0)]);
}
