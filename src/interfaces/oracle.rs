use serde::{Deserialize, Serialize};
use crate::error::Result;
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleRound {
    pub round_id: u64,
    pub price: Price,
    pub updated_at: Timestamp,
}

#[cfg_attr(test, mockall::automock)]
pub trait PriceOracle {
    fn latest_price(&self) -> Result<OracleRound>;
}
