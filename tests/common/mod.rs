#![allow(dead_code)]

use std::sync::Arc;
use cipher_perp::config::EngineConfig;
use cipher_perp::coprocessor::local::LocalCoprocessor;
use cipher_perp::core::engine::Engine;
use cipher_perp::encrypted::signed_value::SignedValue;
use cipher_perp::interfaces::clock::{Clock, ManualClock};
use cipher_perp::price::manual::ManualOracle;
use cipher_perp::settlement::balance_manager::BalanceManager;
use cipher_perp::types::ids::{PositionId, UserId};
use cipher_perp::types::position::{PositionStatus, Side};
use cipher_perp::types::price::Price;
use cipher_perp::types::timestamp::Timestamp;
use cipher_perp::SIZE_PRECISION;

pub type LocalEngine = Engine<LocalCoprocessor, BalanceManager>;

pub const START: Timestamp = Timestamp(1_700_000_000);
pub const ENTRY_PRICE: u64 = 2_000;
pub const POOL_LIQUIDITY: u64 = 1_000_000 * SIZE_PRECISION;
pub const DEPOSIT: u64 = 10_000 * SIZE_PRECISION;

pub struct Harness {
    pub engine: LocalEngine,
    pub clock: ManualClock,
    pub oracle: ManualOracle,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default(), POOL_LIQUIDITY)
    }

    pub fn with_config(config: EngineConfig, liquidity: u64) -> Self {
        let clock = ManualClock::new(START);
        let oracle = ManualOracle::new(Price::from_units(ENTRY_PRICE), START);
        let mut engine = Engine::new(
            config,
            LocalCoprocessor::new(),
            BalanceManager::new(),
            Box::new(oracle.clone()),
            Arc::new(clock.clone()),
        ).unwrap();
        engine.add_liquidity(liquidity).unwrap();
        Harness { engine, clock, oracle }
    }

    pub fn trader(&mut self) -> UserId {
        let trader = UserId::new();
        self.engine.bank_mut().deposit(trader, DEPOSIT).unwrap();
        trader
    }

    pub fn request(&mut self, owner: UserId, side: Side, size: u64, collateral: u64) -> PositionId {
        let input = self.engine.coprocessor_mut().encrypt_input(size as u128, owner);
        self.engine.open_position_request(owner, side, input, collateral, None, None).unwrap()
    }

    /// Request, validate, reveal and open.
    pub fn open(&mut self, owner: UserId, side: Side, size: u64, collateral: u64) -> PositionId {
        let id = self.request(owner, side, size, collateral);
        self.engine.process(&[id]);
        self.fulfill();
        self.engine.process(&[id]);
        assert_eq!(self.engine.position(id).unwrap().status, PositionStatus::Open);
        id
    }

    pub fn fulfill(&mut self) -> usize {
        self.engine.coprocessor_mut().fulfill_reveals()
    }

    pub fn set_price(&self, units: u64) {
        self.oracle.set_price(Price::from_units(units), self.clock.now()).unwrap();
    }

    pub fn advance(&self, secs: u64) -> Timestamp {
        self.clock.advance(secs)
    }

    pub fn balance(&self, user: UserId) -> u64 {
        use cipher_perp::interfaces::balance_provider::BalanceProvider;
        self.engine.bank().balance_of(user).unwrap()
    }

    pub fn signed(&self, value: &SignedValue) -> i128 {
        signed(self.engine.coprocessor(), value)
    }
}

pub fn signed(cop: &LocalCoprocessor, value: &SignedValue) -> i128 {
    let magnitude = cop.plaintext(value.magnitude).unwrap() as i128;
    if cop.plaintext_bool(value.sign).unwrap() { magnitude } else { -magnitude }
}

pub fn usd(units: u64) -> u64 {
    units * SIZE_PRECISION
}
