use serde::{Deserialize, Serialize};
use crate::types::ids::PositionId;
use crate::types::price::Price;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationCheckRequested {
    pub position_id: PositionId,
    pub mark_price: Price,
}

/// Only the revealed flag is published, never the equity behind it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationCheckResolved {
    pub position_id: PositionId,
    pub liquidatable: bool,
    pub mark_price: Price,
}
