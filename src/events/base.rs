use serde::{Deserialize, Serialize};
use sha2::{Sha256, Digest};
use crate::types::ids::{EventId, PositionId};
use crate::types::timestamp::Timestamp;

/// Envelope for everything the engine emits. Payloads carry only public
/// data: ids, plaintext parameters and values that were revealed on purpose.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaseEvent {
    pub event_id: EventId,
    pub event_type: EventType,
    pub sequence: u64,
    pub timestamp: Timestamp,
    pub position_id: Option<PositionId>,
    pub payload: EventPayload,
    pub checksum: String,
}

impl BaseEvent {
    pub fn new(event_type: EventType, timestamp: Timestamp, payload: EventPayload) -> Self {
        let mut event = BaseEvent {
            event_id: EventId::new(),
            event_type,
            sequence: 0, // Set by event log
            timestamp,
            position_id: payload.position_id(),
            payload,
            checksum: String::new(),
        };
        event.checksum = event.calculate_checksum();
        event
    }

    pub fn calculate_checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.event_id.0.as_bytes());
        hasher.update(self.sequence.to_le_bytes());
        hasher.update(self.timestamp.0.to_le_bytes());
        hasher.update(format!("{:?}", self.event_type).as_bytes());
        hasher.update(format!("{:?}", self.payload).as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == self.calculate_checksum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    PositionRequested(crate::events::position::PositionRequested),
    PositionRemoved(crate::events::position::PositionRemoved),
    PositionOpened(crate::events::position::PositionOpened),
    SettlementRequested(crate::events::position::SettlementRequested),
    PositionSettled(crate::events::position::PositionSettled),
    LiquidationCheckRequested(crate::events::liquidation::LiquidationCheckRequested),
    LiquidationCheckResolved(crate::events::liquidation::LiquidationCheckResolved),
    FundingRateUpdated(crate::events::funding::FundingRateUpdated),
    FundingPublished(crate::events::funding::FundingPublished),
    ImpactPublished(crate::events::funding::ImpactPublished),
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            EventPayload::PositionRequested(_) => EventType::PositionRequested,
            EventPayload::PositionRemoved(_) => EventType::PositionRemoved,
            EventPayload::PositionOpened(_) => EventType::PositionOpened,
            EventPayload::SettlementRequested(_) => EventType::SettlementRequested,
            EventPayload::PositionSettled(_) => EventType::PositionSettled,
            EventPayload::LiquidationCheckRequested(_) => EventType::LiquidationCheckRequested,
            EventPayload::LiquidationCheckResolved(_) => EventType::LiquidationCheckResolved,
            EventPayload::FundingRateUpdated(_) => EventType::FundingRateUpdated,
            EventPayload::FundingPublished(_) => EventType::FundingPublished,
            EventPayload::ImpactPublished(_) => EventType::ImpactPublished,
        }
    }

    pub fn position_id(&self) -> Option<PositionId> {
        match self {
            EventPayload::PositionRequested(e) => Some(e.position_id),
            EventPayload::PositionRemoved(e) => Some(e.position_id),
            EventPayload::PositionOpened(e) => Some(e.position_id),
            EventPayload::SettlementRequested(e) => Some(e.position_id),
            EventPayload::PositionSettled(e) => Some(e.receipt.position_id),
            EventPayload::LiquidationCheckRequested(e) => Some(e.position_id),
            EventPayload::LiquidationCheckResolved(e) => Some(e.position_id),
            EventPayload::FundingRateUpdated(_)
            | EventPayload::FundingPublished(_)
            | EventPayload::ImpactPublished(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    PositionRequested,
    PositionRemoved,
    PositionOpened,
    SettlementRequested,
    PositionSettled,
    LiquidationCheckRequested,
    LiquidationCheckResolved,
    FundingRateUpdated,
    FundingPublished,
    ImpactPublished,
}
