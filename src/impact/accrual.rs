use serde::{Deserialize, Serialize};
use crate::encrypted::handle::{EUint, Party};
use crate::encrypted::signed_value::{self, SignedValue};
use crate::error::Result;
use crate::funding::accrual::FundingState;
use crate::gateway::decryption::{DecryptionGateway, PendingSignedReveal};
use crate::interfaces::coprocessor::Coprocessor;
use crate::types::position::Side;
use crate::types::timestamp::Timestamp;
use crate::BPS;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedImpact {
    pub cumulative: i128,
    pub published_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingImpactPublication {
    pub cumulative: PendingSignedReveal,
    pub as_of: Timestamp,
}

/// Net price impact retained by the pool: the sum of every negated entry
/// impact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactState {
    pub cumulative: SignedValue,
    pub published: Option<PublishedImpact>,
    pub pending_publication: Option<PendingImpactPublication>,
}

pub struct ImpactAccrual {
    impact_factor_bps: u64,
    state: ImpactState,
}

impl ImpactAccrual {
    pub fn new<C: Coprocessor + ?Sized>(cop: &mut C, impact_factor_bps: u64) -> Result<Self> {
        let cumulative = SignedValue::zero(cop);
        cumulative.allow(cop, Party::Engine)?;
        Ok(ImpactAccrual {
            impact_factor_bps,
            state: ImpactState {
                cumulative,
                published: None,
                pending_publication: None,
            },
        })
    }

    pub fn from_state(impact_factor_bps: u64, state: ImpactState) -> Self {
        ImpactAccrual { impact_factor_bps, state }
    }

    pub fn state(&self) -> &ImpactState {
        &self.state
    }

    /// Impact credited to a position opening on `side`, evaluated against
    /// open interest before the position is added to it. Opening into the
    /// heavier (or equal) side is a penalty, into the lighter side a rebate.
    pub fn entry_impact<C: Coprocessor + ?Sized>(
        &self,
        cop: &mut C,
        funding: &FundingState,
        side: Side,
        size: EUint,
    ) -> Result<SignedValue> {
        let same_side = funding.open_interest_for(side);
        let other_side = funding.open_interest_for(side.opposite());
        let rebate = cop.lt(same_side, other_side)?;

        let scaled = cop.mul_scalar(size, self.impact_factor_bps as u128)?;
        let magnitude = cop.div_scalar(scaled, BPS as u128)?;

        signed_value::normalize(cop, &SignedValue::new(rebate, magnitude))
    }

    /// Books the pool's side of an entry impact.
    pub fn record<C: Coprocessor + ?Sized>(&mut self, cop: &mut C, entry_impact: &SignedValue) -> Result<()> {
        let retained = signed_value::negate(cop, entry_impact)?;
        let cumulative = signed_value::add(cop, &self.state.cumulative, &retained)?;
        cumulative.allow(cop, Party::Engine)?;
        self.state.cumulative = cumulative;
        Ok(())
    }

    pub fn request_publication<C: Coprocessor + ?Sized>(&mut self, cop: &mut C, now: Timestamp) -> Result<()> {
        let cumulative = DecryptionGateway::request_signed(cop, &self.state.cumulative, now)?;
        self.state.pending_publication = Some(PendingImpactPublication {
            cumulative,
            as_of: now,
        });
        tracing::info!("Impact publication requested as of {}", now);
        Ok(())
    }

    pub fn finalize_publication<C: Coprocessor + ?Sized>(&mut self, cop: &C) -> Result<Option<PublishedImpact>> {
        let Some(pending) = self.state.pending_publication else {
            return Ok(None);
        };
        let Some(cumulative) = DecryptionGateway::poll_signed(cop, &pending.cumulative)? else {
            return Ok(None);
        };

        let published = PublishedImpact {
            cumulative,
            published_at: pending.as_of,
        };
        self.state.published = Some(published);
        self.state.pending_publication = None;
        tracing::info!("Impact published: cumulative={}, as_of={}", cumulative, pending.as_of);
        Ok(Some(published))
    }
}
