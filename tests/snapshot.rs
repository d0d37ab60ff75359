mod common;

use common::{Harness, usd};
use cipher_perp::error::Error;
use cipher_perp::event_log::snapshot_manager::SnapshotManager;
use cipher_perp::types::position::{PositionStatus, Side};
use uuid::Uuid;

fn scratch_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("cipher-perp-{}", Uuid::new_v4()))
}

#[tokio::test]
async fn snapshot_round_trips_through_disk() {
    let mut h = Harness::new();
    let trader = h.trader();
    let open = h.open(trader, Side::Long, usd(1_000), usd(100));
    let snapshot = h.engine.snapshot();
    assert!(snapshot.verify_checksum());

    let dir = scratch_dir();
    let manager = SnapshotManager::new(&dir, 5);
    manager.save_snapshot(&snapshot).await.unwrap();

    let later = h.request(trader, Side::Short, usd(500), usd(50));
    assert_eq!(h.engine.positions().len(), 2);

    let loaded = manager.load_latest().await.unwrap();
    assert_eq!(loaded.checksum, snapshot.checksum);
    h.engine.restore(loaded).unwrap();

    assert_eq!(h.engine.positions().len(), 1);
    assert_eq!(h.engine.position(open).unwrap().status, PositionStatus::Open);
    assert!(h.engine.position(later).is_err());
    assert_eq!(h.engine.events().last_sequence(), snapshot.last_event_sequence);

    // restored handles are still usable
    h.engine.close_position(open, trader).unwrap();
    h.fulfill();
    assert!(h.engine.settle_position(open).unwrap().is_some());

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[test]
fn tampered_snapshot_is_rejected() {
    let mut h = Harness::new();
    let trader = h.trader();
    h.open(trader, Side::Long, usd(1_000), usd(100));

    let mut snapshot = h.engine.snapshot();
    snapshot.pool.balance += 1;

    assert!(matches!(h.engine.restore(snapshot), Err(Error::InvalidChecksum)));
    assert_eq!(h.engine.positions().len(), 1);
}

#[tokio::test]
async fn missing_directory_has_no_snapshot() {
    let manager = SnapshotManager::new(scratch_dir(), 5);
    assert!(matches!(manager.load_latest().await, Err(Error::NoSnapshotFound)));
}

#[tokio::test]
async fn retention_keeps_newest_snapshots() {
    let mut h = Harness::new();
    let trader = h.trader();
    let dir = scratch_dir();
    let manager = SnapshotManager::new(&dir, 2);

    for _ in 0..3 {
        h.request(trader, Side::Long, usd(100), usd(10));
        manager.save_snapshot(&h.engine.snapshot()).await.unwrap();
    }

    let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
    let mut count = 0;
    while entries.next_entry().await.unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 2);
    assert_eq!(manager.load_latest().await.unwrap().positions.len(), 3);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
