use crate::error::{Error, Result};
use crate::types::ids::PositionId;
use crate::types::position::{Position, PositionStatus};
use crate::types::timestamp::Timestamp;

/// Append-only position table. A position's id is its index; records are
/// never deleted or compacted.
#[derive(Default)]
pub struct PositionLedger {
    positions: Vec<Position>,
}

impl PositionLedger {
    pub fn new() -> Self {
        PositionLedger {
            positions: Vec::new(),
        }
    }

    pub fn from_positions(positions: Vec<Position>) -> Result<Self> {
        for (index, position) in positions.iter().enumerate() {
            if position.id.index() != index {
                return Err(Error::InvalidInput(format!(
                    "position {} stored at index {}",
                    position.id, index
                )));
            }
        }
        Ok(PositionLedger { positions })
    }

    pub fn next_id(&self) -> PositionId {
        PositionId(self.positions.len() as u64)
    }

    pub fn insert(&mut self, position: Position) -> Result<PositionId> {
        let expected = self.next_id();
        if position.id != expected {
            return Err(Error::InvalidInput(format!(
                "expected position id {}, got {}",
                expected, position.id
            )));
        }
        self.positions.push(position);
        Ok(expected)
    }

    pub fn get(&self, id: PositionId) -> Result<&Position> {
        self.positions.get(id.index()).ok_or(Error::PositionNotFound(id))
    }

    pub fn get_mut(&mut self, id: PositionId) -> Result<&mut Position> {
        self.positions.get_mut(id.index()).ok_or(Error::PositionNotFound(id))
    }

    /// Fails unless `id` is live and currently in `status`.
    pub fn ensure_status(&self, id: PositionId, status: PositionStatus, action: &'static str) -> Result<&Position> {
        let position = self.get(id)?;
        if position.removed || position.status != status {
            return Err(Error::InvalidStateTransition {
                position_id: id,
                from: position.status,
                action,
            });
        }
        Ok(position)
    }

    pub fn transition(&mut self, id: PositionId, next: PositionStatus, now: Timestamp) -> Result<()> {
        let position = self.get_mut(id)?;
        if position.removed || !position.status.can_transition_to(next) {
            return Err(Error::InvalidStateTransition {
                position_id: id,
                from: position.status,
                action: "transition",
            });
        }
        tracing::debug!("Position {} {:?} -> {:?}", id, position.status, next);
        position.status = next;
        position.updated_at = now;
        Ok(())
    }

    /// Invalidates a request that never opened. The id stays allocated.
    pub fn mark_removed(&mut self, id: PositionId, now: Timestamp) -> Result<()> {
        let position = self.get_mut(id)?;
        let removable = matches!(position.status, PositionStatus::Requested | PositionStatus::Pending);
        if position.removed || !removable {
            return Err(Error::InvalidStateTransition {
                position_id: id,
                from: position.status,
                action: "remove",
            });
        }
        position.removed = true;
        position.validation = None;
        position.updated_at = now;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.iter()
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn active_ids(&self) -> Vec<PositionId> {
        self.positions.iter()
            .filter(|p| p.is_active())
            .map(|p| p.id)
            .collect()
    }

    pub fn open_ids(&self) -> Vec<PositionId> {
        self.positions.iter()
            .filter(|p| p.is_open())
            .map(|p| p.id)
            .collect()
    }
}
