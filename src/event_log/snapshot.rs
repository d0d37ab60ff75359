use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use crate::funding::accrual::FundingState;
use crate::impact::accrual::ImpactState;
use crate::settlement::pool::LiquidityPool;
use crate::types::position::Position;
use crate::types::timestamp::Timestamp;

/// Ledger state at a point in time. Encrypted fields are handles into the
/// coprocessor's persistent store, so a snapshot only restores against the
/// coprocessor that issued them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub taken_at: Timestamp,
    pub positions: Vec<Position>,
    pub funding: FundingState,
    pub impact: ImpactState,
    pub pool: LiquidityPool,
    pub next_position_id: u64,
    pub last_event_sequence: u64,
    pub checksum: String,
}

impl LedgerSnapshot {
    pub fn new(
        taken_at: Timestamp,
        positions: Vec<Position>,
        funding: FundingState,
        impact: ImpactState,
        pool: LiquidityPool,
        last_event_sequence: u64,
    ) -> Self {
        let mut snapshot = LedgerSnapshot {
            version: crate::SNAPSHOT_VERSION,
            taken_at,
            next_position_id: positions.len() as u64,
            positions,
            funding,
            impact,
            pool,
            last_event_sequence,
            checksum: String::new(),
        };

        snapshot.checksum = snapshot.calculate_checksum();
        snapshot
    }

    fn calculate_checksum(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(self.version.to_le_bytes());
        hasher.update(self.taken_at.0.to_le_bytes());
        hasher.update(self.next_position_id.to_le_bytes());
        hasher.update(self.last_event_sequence.to_le_bytes());

        hasher.update(self.pool.balance.to_le_bytes());
        hasher.update(self.pool.escrow.to_le_bytes());
        hasher.update(self.pool.collected_fees.to_le_bytes());

        for position in &self.positions {
            hasher.update(position.id.0.to_le_bytes());
            hasher.update(position.size.0.0.to_le_bytes());
            hasher.update(position.collateral.to_le_bytes());
            hasher.update(format!("{:?}{}", position.status, position.removed).as_bytes());
        }

        hasher.update(format!("{:?}", self.funding).as_bytes());
        hasher.update(format!("{:?}", self.impact).as_bytes());

        hex::encode(hasher.finalize())
    }

    pub fn verify_checksum(&self) -> bool {
        self.checksum == self.calculate_checksum()
    }
}
