use lazy_static::lazy_static;
use prometheus::{
    Counter, Histogram, HistogramOpts, IntCounter, IntGauge, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Position lifecycle metrics
    pub static ref POSITIONS_REQUESTED: IntCounter = IntCounter::new(
        "positions_requested_total",
        "Total number of position requests accepted"
    ).unwrap();

    pub static ref POSITIONS_OPENED: IntCounter = IntCounter::new(
        "positions_opened_total",
        "Total number of positions opened"
    ).unwrap();

    pub static ref POSITIONS_REMOVED: IntCounter = IntCounter::new(
        "positions_removed_total",
        "Total number of invalid or cancelled requests removed"
    ).unwrap();

    pub static ref POSITIONS_SETTLED: IntCounter = IntCounter::new(
        "positions_settled_total",
        "Total number of positions settled"
    ).unwrap();

    // Liquidation metrics
    pub static ref LIQUIDATION_CHECKS_REQUESTED: IntCounter = IntCounter::new(
        "liquidation_checks_requested_total",
        "Total number of liquidation checks requested"
    ).unwrap();

    pub static ref LIQUIDATIONS_FLAGGED: IntCounter = IntCounter::new(
        "liquidations_flagged_total",
        "Total number of positions found liquidatable"
    ).unwrap();

    // Coprocessor metrics
    pub static ref REVEALS_REQUESTED: IntCounter = IntCounter::new(
        "reveals_requested_total",
        "Total number of decryption requests sent to the gateway"
    ).unwrap();

    // Funding metrics
    pub static ref FUNDING_RATE_UPDATES: IntCounter = IntCounter::new(
        "funding_rate_updates_total",
        "Total number of funding rate installations"
    ).unwrap();

    pub static ref STALE_ORACLE_REJECTIONS: IntCounter = IntCounter::new(
        "stale_oracle_rejections_total",
        "Total number of oracle rounds rejected"
    ).unwrap();

    // Pool metrics
    pub static ref POOL_BALANCE: IntGauge = IntGauge::new(
        "pool_balance",
        "Current liquidity pool balance"
    ).unwrap();

    pub static ref SETTLEMENT_PAYOUT: Counter = Counter::new(
        "settlement_payout_total",
        "Total amount paid out to settled positions"
    ).unwrap();

    // Latency metrics
    pub static ref KEEPER_TICK_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "keeper_tick_latency_seconds",
            "Keeper tick latency"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1])
    ).unwrap();
}

pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(POSITIONS_REQUESTED.clone()))?;
    REGISTRY.register(Box::new(POSITIONS_OPENED.clone()))?;
    REGISTRY.register(Box::new(POSITIONS_REMOVED.clone()))?;
    REGISTRY.register(Box::new(POSITIONS_SETTLED.clone()))?;
    REGISTRY.register(Box::new(LIQUIDATION_CHECKS_REQUESTED.clone()))?;
    REGISTRY.register(Box::new(LIQUIDATIONS_FLAGGED.clone()))?;
    REGISTRY.register(Box::new(REVEALS_REQUESTED.clone()))?;
    REGISTRY.register(Box::new(FUNDING_RATE_UPDATES.clone()))?;
    REGISTRY.register(Box::new(STALE_ORACLE_REJECTIONS.clone()))?;
    REGISTRY.register(Box::new(POOL_BALANCE.clone()))?;
    REGISTRY.register(Box::new(SETTLEMENT_PAYOUT.clone()))?;
    REGISTRY.register(Box::new(KEEPER_TICK_LATENCY.clone()))?;
    Ok(())
}
