use serde::{Deserialize, Serialize};

pub mod market;
pub mod risk;
pub mod fees;
pub mod loader;

pub use fees::FeeConfig;
pub use market::MarketConfig;
pub use risk::RiskConfig;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FundingConfig {
    /// X18 rate per second per whole unit of notional skew.
    pub funding_factor_x18: u64,
    /// Clamp on the per-second rate magnitude, X18.
    pub max_funding_rate_x18: u64,
    pub rate_update_interval_secs: u64,
}

impl Default for FundingConfig {
    fn default() -> Self {
        FundingConfig {
            funding_factor_x18: 10_000,                // 1e-14/s per $1 of skew
            max_funding_rate_x18: 100_000_000_000_000, // 1e-4 (0.01%) per second
            rate_update_interval_secs: 3600,
        }
    }
}

/// Everything the engine itself needs.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EngineConfig {
    pub risk: RiskConfig,
    pub fees: FeeConfig,
    pub funding: FundingConfig,
    pub market: MarketConfig,
}
