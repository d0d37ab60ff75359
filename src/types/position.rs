use serde::{Deserialize, Serialize};
use crate::encrypted::handle::{EBool, EUint};
use crate::encrypted::signed_value::SignedValue;
use crate::gateway::decryption::{PendingDecryptRequest, PendingSignedReveal};
use crate::types::ids::{PositionId, UserId};
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Long => Side::Short,
            Side::Short => Side::Long,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionStatus {
    Requested,
    Pending,
    Open,
    AwaitingSettlement,
    Liquidated,
    Closed,
}

impl PositionStatus {
    /// The only edges of the lifecycle. Everything else is rejected.
    pub fn can_transition_to(&self, next: PositionStatus) -> bool {
        use PositionStatus::*;
        matches!(
            (self, next),
            (Requested, Pending)
                | (Pending, Open)
                | (Open, AwaitingSettlement)
                | (AwaitingSettlement, Liquidated)
                | (AwaitingSettlement, Closed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PositionStatus::Liquidated | PositionStatus::Closed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloseCause {
    User,
    Liquidation,
    TakeProfit,
    StopLoss,
}

/// Reveals needed before a position can be paid out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequests {
    pub size: PendingDecryptRequest,
    pub funding: PendingSignedReveal,
    pub impact: PendingSignedReveal,
}

/// Plaintext outcome of a settled position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    pub position_id: PositionId,
    pub size: u128,
    pub pnl: i128,
    pub funding: i128,
    pub impact: i128,
    pub equity: i128,
    pub fee: u64,
    pub payout: u64,
    pub status: PositionStatus,
    pub settled_at: Timestamp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub owner: UserId,
    pub side: Side,
    pub size: EUint,
    pub collateral: u64,
    pub entry_price: Price,
    pub entry_funding: SignedValue,
    pub entry_impact: SignedValue,
    pub status: PositionStatus,
    /// Set when a request is invalidated before opening. Ids are never reused.
    pub removed: bool,
    pub take_profit: Option<Price>,
    pub stop_loss: Option<Price>,
    pub pending_liquidation_flag: Option<EBool>,
    pub pending_liquidation_price: Price,
    pub settlement_price: Price,
    pub close_cause: Option<CloseCause>,
    pub validation: Option<PendingDecryptRequest>,
    pub liquidation_check: Option<PendingDecryptRequest>,
    pub settlement: Option<SettlementRequests>,
    pub receipt: Option<SettlementReceipt>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Position {
    /// Not removed and not in a terminal state.
    pub fn is_active(&self) -> bool {
        !self.removed && !self.status.is_terminal()
    }

    pub fn is_open(&self) -> bool {
        !self.removed && self.status == PositionStatus::Open
    }

    /// Take-profit or stop-loss hit at `price`, take-profit first.
    pub fn triggered_exit(&self, price: Price) -> Option<CloseCause> {
        let (tp_hit, sl_hit) = match self.side {
            Side::Long => (
                self.take_profit.is_some_and(|tp| price >= tp),
                self.stop_loss.is_some_and(|sl| price <= sl),
            ),
            Side::Short => (
                self.take_profit.is_some_and(|tp| price <= tp),
                self.stop_loss.is_some_and(|sl| price >= sl),
            ),
        };
        if tp_hit {
            Some(CloseCause::TakeProfit)
        } else if sl_hit {
            Some(CloseCause::StopLoss)
        } else {
            None
        }
    }
}
