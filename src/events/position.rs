use serde::{Deserialize, Serialize};
use crate::types::ids::{PositionId, UserId};
use crate::types::position::{CloseCause, SettlementReceipt, Side};
use crate::types::price::Price;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRequested {
    pub position_id: PositionId,
    pub owner: UserId,
    pub side: Side,
    pub collateral: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRemoved {
    pub position_id: PositionId,
    pub reason: RemovalReason,
    pub refunded: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalReason {
    Invalid,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOpened {
    pub position_id: PositionId,
    pub side: Side,
    pub entry_price: Price,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequested {
    pub position_id: PositionId,
    pub cause: CloseCause,
    pub settlement_price: Price,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSettled {
    pub receipt: SettlementReceipt,
}
