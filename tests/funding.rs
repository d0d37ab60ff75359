mod common;

use common::{Harness, usd};
use cipher_perp::types::position::Side;

const RATE_X18: i128 = 100_000_000_000_000;  // 1e14 per second

#[test]
fn one_hour_at_1e14_accrues_3_6e17() {
    let mut h = Harness::new();
    h.engine.set_funding_rate(RATE_X18).unwrap();

    h.advance(3_600);
    assert!(h.engine.poke_funding().unwrap());

    let state = h.engine.funding_state().clone();
    assert_eq!(h.signed(&state.cumulative_long), 360_000_000_000_000_000);
    assert_eq!(h.signed(&state.cumulative_short), -360_000_000_000_000_000);
}

#[test]
fn second_poke_at_same_instant_changes_nothing() {
    let mut h = Harness::new();
    h.engine.set_funding_rate(RATE_X18).unwrap();
    h.advance(60);

    assert!(h.engine.poke_funding().unwrap());
    let first = h.engine.funding_state().clone();
    assert!(!h.engine.poke_funding().unwrap());
    let second = h.engine.funding_state().clone();

    assert_eq!(first, second);
    assert_eq!(h.signed(&second.cumulative_long), 6_000_000_000_000_000);
}

#[test]
fn rate_change_accrues_under_old_rate_first() {
    let mut h = Harness::new();
    h.engine.set_funding_rate(RATE_X18).unwrap();
    h.advance(100);
    h.engine.set_funding_rate(-RATE_X18).unwrap();
    h.advance(40);
    h.engine.poke_funding().unwrap();

    let state = h.engine.funding_state().clone();
    assert_eq!(h.signed(&state.cumulative_long), 60 * RATE_X18);
    assert_eq!(h.signed(&state.cumulative_short), -60 * RATE_X18);
}

#[test]
fn rate_above_cap_is_rejected() {
    let mut h = Harness::new();
    assert!(h.engine.set_funding_rate(RATE_X18 + 1).is_err());
}

#[test]
fn skew_sets_rate_with_sign_of_heavier_side() {
    let mut h = Harness::new();
    let long_trader = h.trader();
    h.open(long_trader, Side::Long, usd(3_000), usd(300));

    h.engine.set_funding_rate_from_skew().unwrap();
    let rate = h.engine.funding_state().rate_per_second;
    // $3,000 skew * 1e4 / 1e6
    assert_eq!(h.signed(&rate), 30_000_000);
}

#[test]
fn publication_reveals_accumulators_once_ready() {
    let mut h = Harness::new();
    h.engine.set_funding_rate(RATE_X18).unwrap();
    h.advance(3_600);

    h.engine.request_funding_publication().unwrap();
    assert_eq!(h.engine.finalize_funding_publication().unwrap(), None);

    h.fulfill();
    let published = h.engine.finalize_funding_publication().unwrap().unwrap();
    assert_eq!(published.rate_per_second, RATE_X18);
    assert_eq!(published.cumulative_long, 360_000_000_000_000_000);
    assert_eq!(published.cumulative_short, -360_000_000_000_000_000);
    assert_eq!(published.published_at, h.engine.now());
}
