use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FeeConfig {
    pub close_fee_bps: u64,
    pub liquidation_fee_bps: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        FeeConfig {
            close_fee_bps: 10,         // 0.1%
            liquidation_fee_bps: 500,  // 5%
        }
    }
}
