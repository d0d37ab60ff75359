use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RiskConfig {
    pub maintenance_margin_bps: u64,
    /// Upper bound on size / collateral, checked encrypted at open.
    pub max_leverage: u64,
    pub min_collateral: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            maintenance_margin_bps: 100,  // 1%
            max_leverage: 50,
            min_collateral: 1_000_000,    // $1
        }
    }
}
