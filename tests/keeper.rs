mod common;

use common::{Harness, usd};
use cipher_perp::keeper::ticker::KeeperTicker;
use cipher_perp::types::position::{PositionStatus, Side};
use tokio::time::Duration;

#[test]
fn ticks_walk_a_request_through_to_liquidation_checks() {
    let mut h = Harness::new();
    let trader = h.trader();
    let id = h.request(trader, Side::Long, usd(1_000), usd(100));
    let mut keeper = KeeperTicker::new(Duration::from_millis(10), 3_600);

    let first = keeper.run_once(&mut h.engine);
    assert!(first.rate_updated);
    assert_eq!(first.processed.succeeded, vec![id]);
    assert_eq!(h.engine.position(id).unwrap().status, PositionStatus::Pending);

    h.fulfill();
    let second = keeper.run_once(&mut h.engine);
    assert!(!second.rate_updated);
    assert_eq!(h.engine.position(id).unwrap().status, PositionStatus::Open);
    assert_eq!(second.requested_checks.succeeded, vec![id]);

    h.fulfill();
    let third = keeper.run_once(&mut h.engine);
    assert_eq!(third.processed.succeeded, vec![id]);
    assert_eq!(third.requested_checks.succeeded, vec![id]);
    assert!(third.errors.is_empty());
    assert_eq!(h.engine.position(id).unwrap().status, PositionStatus::Open);
}

#[test]
fn rate_is_refreshed_once_the_interval_elapses() {
    let mut h = Harness::new();
    let mut keeper = KeeperTicker::new(Duration::from_millis(10), 60);

    assert!(keeper.run_once(&mut h.engine).rate_updated);
    h.advance(30);
    assert!(!keeper.run_once(&mut h.engine).rate_updated);
    h.advance(30);
    assert!(keeper.run_once(&mut h.engine).rate_updated);
}

#[test]
fn stale_oracle_is_reported_not_fatal() {
    let mut h = Harness::new();
    let trader = h.trader();
    let id = h.open(trader, Side::Short, usd(1_000), usd(100));
    let mut keeper = KeeperTicker::new(Duration::from_millis(10), 3_600);

    h.advance(600);
    let report = keeper.run_once(&mut h.engine);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(h.engine.position(id).unwrap().status, PositionStatus::Open);
}

#[tokio::test]
async fn run_stops_on_shutdown() {
    use std::sync::Arc;
    use tokio::sync::{watch, Mutex};

    let h = Harness::new();
    let engine = Arc::new(Mutex::new(h.engine));
    let (tx, rx) = watch::channel(false);

    let keeper = KeeperTicker::new(Duration::from_millis(5), 3_600);
    let handle = tokio::spawn(keeper.run(engine.clone(), rx));

    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(true).unwrap();
    handle.await.unwrap();

    assert!(engine.lock().await.events().len() >= 1);
}

#[test]
fn repeated_checks_do_not_accumulate_ciphertexts_or_reveals() {
    let mut h = Harness::new();
    let trader = h.trader();
    h.open(trader, Side::Long, usd(1_000), usd(100));
    let mut keeper = KeeperTicker::new(Duration::from_millis(10), 3_600);

    keeper.run_once(&mut h.engine);
    h.fulfill();
    keeper.run_once(&mut h.engine);
    h.fulfill();
    let stored = h.engine.coprocessor().stored_values();
    let reveals = h.engine.coprocessor().open_reveals();
    assert_eq!(reveals, 1);

    for _ in 0..5 {
        let report = keeper.run_once(&mut h.engine);
        assert!(report.errors.is_empty());
        h.fulfill();
    }
    assert_eq!(h.engine.coprocessor().stored_values(), stored);
    assert_eq!(h.engine.coprocessor().open_reveals(), reveals);
}
