mod common;

use common::{Harness, usd};
use cipher_perp::core::report::LiquidationOutcome;
use cipher_perp::error::Error;
use cipher_perp::types::position::{CloseCause, PositionStatus, Side};
use cipher_perp::types::price::Price;

#[test]
fn long_at_2000_marked_at_1800_is_liquidatable() {
    let mut h = Harness::new();
    let trader = h.trader();
    let id = h.open(trader, Side::Long, 1_000_000_000, 50_000_000);

    h.set_price(1_800);
    h.engine.check_liquidation(id).unwrap();
    let position = h.engine.position(id).unwrap();
    assert!(position.liquidation_check.is_some());
    assert_eq!(position.pending_liquidation_price, Price::from_units(1_800));

    let flag = position.pending_liquidation_flag.unwrap();
    assert_eq!(h.engine.coprocessor().plaintext_bool(flag), Some(true));

    h.fulfill();
    assert_eq!(h.engine.finalize_liquidation_check(id).unwrap(), LiquidationOutcome::Liquidating);

    let position = h.engine.position(id).unwrap();
    assert_eq!(position.status, PositionStatus::AwaitingSettlement);
    assert_eq!(position.close_cause, Some(CloseCause::Liquidation));
    assert_eq!(position.settlement_price, Price::from_units(1_800));
    assert!(position.liquidation_check.is_none());
}

#[test]
fn finalize_before_reveal_is_a_no_op() {
    let mut h = Harness::new();
    let trader = h.trader();
    let id = h.open(trader, Side::Long, 1_000_000_000, 50_000_000);

    assert_eq!(h.engine.finalize_liquidation_check(id).unwrap(), LiquidationOutcome::NotRequested);

    h.set_price(1_800);
    h.engine.check_liquidation(id).unwrap();
    let before = h.engine.position(id).unwrap().clone();
    assert_eq!(h.engine.finalize_liquidation_check(id).unwrap(), LiquidationOutcome::Pending);

    let after = h.engine.position(id).unwrap();
    assert_eq!(after.status, PositionStatus::Open);
    assert_eq!(after.liquidation_check, before.liquidation_check);
    assert_eq!(after.updated_at, before.updated_at);
}

#[test]
fn healthy_position_stays_open() {
    let mut h = Harness::new();
    let trader = h.trader();
    let id = h.open(trader, Side::Long, 1_000_000_000, 50_000_000);

    h.set_price(1_990);
    h.engine.check_liquidation(id).unwrap();
    h.fulfill();
    assert_eq!(h.engine.finalize_liquidation_check(id).unwrap(), LiquidationOutcome::Healthy);

    let position = h.engine.position(id).unwrap();
    assert_eq!(position.status, PositionStatus::Open);
    assert!(position.liquidation_check.is_none());
}

#[test]
fn short_is_liquidated_when_price_rises() {
    let mut h = Harness::new();
    let trader = h.trader();
    let id = h.open(trader, Side::Short, 1_000_000_000, 50_000_000);

    h.set_price(2_100);
    h.engine.check_liquidation(id).unwrap();
    h.fulfill();
    assert_eq!(h.engine.finalize_liquidation_check(id).unwrap(), LiquidationOutcome::Liquidating);
}

#[test]
fn batch_checks_use_the_oracle_and_report_per_id() {
    let mut h = Harness::new();
    let trader = h.trader();
    let risky = h.open(trader, Side::Long, 1_000_000_000, 50_000_000);
    let safe = h.open(trader, Side::Short, 1_000_000_000, usd(500));
    let requested = h.request(trader, Side::Long, usd(100), usd(10));

    h.set_price(1_800);
    let report = h.engine.request_liquidation_checks(&[risky, safe, requested]).unwrap();
    assert_eq!(report.succeeded, vec![risky, safe]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, requested);

    let report = h.engine.finalize_liquidation_checks(&[risky, safe]);
    assert_eq!(report.pending, vec![risky, safe]);

    h.fulfill();
    let report = h.engine.finalize_liquidation_checks(&[risky, safe, requested]);
    assert_eq!(report.succeeded, vec![risky, safe]);
    assert_eq!(report.skipped, vec![requested]);
    assert_eq!(h.engine.position(risky).unwrap().status, PositionStatus::AwaitingSettlement);
    assert_eq!(h.engine.position(safe).unwrap().status, PositionStatus::Open);
}

#[test]
fn stale_oracle_aborts_batch_check() {
    let mut h = Harness::new();
    let trader = h.trader();
    let id = h.open(trader, Side::Long, 1_000_000_000, 50_000_000);

    h.advance(600);
    assert!(matches!(h.engine.request_liquidation_checks(&[id]), Err(Error::StaleOracle(_))));
    assert!(h.engine.position(id).unwrap().liquidation_check.is_none());
}

#[test]
fn accrued_funding_can_tip_a_position_into_liquidation() {
    let mut h = Harness::new();
    let trader = h.trader();
    let id = h.open(trader, Side::Long, 1_000_000_000, 50_000_000);

    // longs pay 1e-4 per second: $0.10 per second on $1,000
    h.engine.set_funding_rate(100_000_000_000_000).unwrap();
    h.advance(300);
    h.set_price(2_000);
    h.engine.check_liquidation(id).unwrap();
    let flag = h.engine.position(id).unwrap().pending_liquidation_flag.unwrap();
    assert_eq!(h.engine.coprocessor().plaintext_bool(flag), Some(false));

    h.advance(200);
    h.set_price(2_000);
    h.engine.check_liquidation(id).unwrap();
    let flag = h.engine.position(id).unwrap().pending_liquidation_flag.unwrap();
    assert_eq!(h.engine.coprocessor().plaintext_bool(flag), Some(true));
}

#[test]
fn single_check_prices_at_the_oracle_not_the_caller() {
    let mut h = Harness::new();
    let trader = h.trader();
    let id = h.open(trader, Side::Long, usd(1_000), usd(500));

    h.engine.check_liquidation(id).unwrap();
    let position = h.engine.position(id).unwrap();
    assert_eq!(position.pending_liquidation_price, Price::from_units(2_000));

    h.fulfill();
    assert_eq!(h.engine.finalize_liquidation_check(id).unwrap(), LiquidationOutcome::Healthy);
    assert_eq!(h.engine.position(id).unwrap().status, PositionStatus::Open);
    assert!(h.engine.settle_position(id).is_err());
}

#[test]
fn single_check_rejects_a_stale_oracle() {
    let mut h = Harness::new();
    let trader = h.trader();
    let id = h.open(trader, Side::Long, usd(1_000), usd(500));

    h.advance(600);
    assert!(matches!(h.engine.check_liquidation(id), Err(Error::StaleOracle(_))));
    assert!(h.engine.position(id).unwrap().liquidation_check.is_none());
}
