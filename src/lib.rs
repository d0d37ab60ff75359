pub mod error;
pub mod config;
pub mod types;
pub mod encrypted;
pub mod interfaces;
pub mod coprocessor;
pub mod gateway;
pub mod funding;
pub mod impact;
pub mod ledger;
pub mod liquidation;
pub mod settlement;
pub mod price;
pub mod events;
pub mod event_log;
pub mod core;
pub mod keeper;
pub mod observability;

// Snapshot version
pub const SNAPSHOT_VERSION: u32 = 1;

// Prices carry 8 decimals
pub const PRICE_PRECISION: u64 = 100_000_000;

// Collateral, size and payouts carry 6 decimals
pub const SIZE_PRECISION: u64 = 1_000_000;

// Funding rates and accumulators are X18
pub const FUNDING_PRECISION: u128 = 1_000_000_000_000_000_000;

pub const BPS: u64 = 10_000;
