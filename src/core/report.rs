use serde::Serialize;
use crate::types::ids::PositionId;

/// What one step of a batch did to a position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// State moved forward.
    Advanced,
    /// Waiting on a reveal; retry later.
    Waiting,
    /// Nothing to do for this position.
    Idle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum LiquidationOutcome {
    NotRequested,
    Pending,
    Healthy,
    Liquidating,
    /// The position left `Open` before the check resolved; the check was dropped.
    Stale,
}

impl From<LiquidationOutcome> for StepOutcome {
    fn from(outcome: LiquidationOutcome) -> Self {
        match outcome {
            LiquidationOutcome::Healthy
            | LiquidationOutcome::Liquidating
            | LiquidationOutcome::Stale => StepOutcome::Advanced,
            LiquidationOutcome::Pending => StepOutcome::Waiting,
            LiquidationOutcome::NotRequested => StepOutcome::Idle,
        }
    }
}

/// Per-id result of a batch call. Failures never abort the batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<PositionId>,
    pub pending: Vec<PositionId>,
    pub skipped: Vec<PositionId>,
    pub failed: Vec<(PositionId, String)>,
}

impl BatchReport {
    pub fn record(&mut self, id: PositionId, outcome: StepOutcome) {
        match outcome {
            StepOutcome::Advanced => self.succeeded.push(id),
            StepOutcome::Waiting => self.pending.push(id),
            StepOutcome::Idle => self.skipped.push(id),
        }
    }

    pub fn fail(&mut self, id: PositionId, error: &crate::error::Error) {
        tracing::warn!("Position {} failed: {}", id, error);
        self.failed.push((id, error.to_string()));
    }
}
