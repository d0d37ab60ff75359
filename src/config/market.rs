use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MarketConfig {
    pub symbol: String,
    /// Entry price impact as a fraction of size.
    pub impact_factor_bps: u64,
    pub oracle_max_age_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        MarketConfig {
            symbol: "ETH-PERP".to_string(),
            impact_factor_bps: 5,  // 0.05%
            oracle_max_age_secs: 120,
        }
    }
}
