use serde::{Deserialize, Serialize};
use crate::config::FundingConfig;
use crate::encrypted::handle::{EUint, Party};
use crate::encrypted::signed_value::{self, SignedValue};
use crate::error::Result;
use crate::funding::rate_calculator::FundingRateCalculator;
use crate::gateway::decryption::{DecryptionGateway, PendingSignedReveal};
use crate::interfaces::coprocessor::Coprocessor;
use crate::types::position::Side;
use crate::types::timestamp::Timestamp;
use crate::FUNDING_PRECISION;

/// Plaintext view of the funding accumulators at `published_at`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedFunding {
    pub rate_per_second: i128,
    pub cumulative_long: i128,
    pub cumulative_short: i128,
    pub published_at: Timestamp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFundingPublication {
    pub rate_per_second: PendingSignedReveal,
    pub cumulative_long: PendingSignedReveal,
    pub cumulative_short: PendingSignedReveal,
    pub as_of: Timestamp,
}

/// Singleton funding record. Longs are assessed against `cumulative_long`,
/// shorts against its mirror `cumulative_short`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingState {
    pub rate_per_second: SignedValue,
    pub cumulative_long: SignedValue,
    pub cumulative_short: SignedValue,
    pub open_interest_long: EUint,
    pub open_interest_short: EUint,
    pub last_poke: Timestamp,
    pub published: Option<PublishedFunding>,
    pub pending_publication: Option<PendingFundingPublication>,
}

impl FundingState {
    pub fn cumulative_for(&self, side: Side) -> SignedValue {
        match side {
            Side::Long => self.cumulative_long,
            Side::Short => self.cumulative_short,
        }
    }

    pub fn open_interest_for(&self, side: Side) -> EUint {
        match side {
            Side::Long => self.open_interest_long,
            Side::Short => self.open_interest_short,
        }
    }
}

/// Owns [`FundingState`]. Every rate change accrues under the old rate first.
pub struct FundingAccrual {
    rate_calculator: FundingRateCalculator,
    state: FundingState,
}

impl FundingAccrual {
    pub fn new<C: Coprocessor + ?Sized>(cop: &mut C, config: FundingConfig, now: Timestamp) -> Result<Self> {
        let state = FundingState {
            rate_per_second: SignedValue::zero(cop),
            cumulative_long: SignedValue::zero(cop),
            cumulative_short: SignedValue::zero(cop),
            open_interest_long: cop.trivial_encrypt(0),
            open_interest_short: cop.trivial_encrypt(0),
            last_poke: now,
            published: None,
            pending_publication: None,
        };
        state.rate_per_second.allow(cop, Party::Engine)?;
        state.cumulative_long.allow(cop, Party::Engine)?;
        state.cumulative_short.allow(cop, Party::Engine)?;
        cop.allow(state.open_interest_long.into(), Party::Engine)?;
        cop.allow(state.open_interest_short.into(), Party::Engine)?;

        Ok(FundingAccrual {
            rate_calculator: FundingRateCalculator::new(config),
            state,
        })
    }

    pub fn from_state(config: FundingConfig, state: FundingState) -> Self {
        FundingAccrual {
            rate_calculator: FundingRateCalculator::new(config),
            state,
        }
    }

    pub fn state(&self) -> &FundingState {
        &self.state
    }

    /// Integrates `rate * elapsed` into both accumulators. A second poke at
    /// the same instant changes nothing. Returns whether anything accrued.
    pub fn poke_funding<C: Coprocessor + ?Sized>(&mut self, cop: &mut C, now: Timestamp) -> Result<bool> {
        let elapsed = now.seconds_since(self.state.last_poke);
        if elapsed == 0 {
            return Ok(false);
        }

        let rate = self.state.rate_per_second;
        let increment = cop.mul_scalar(rate.magnitude, elapsed as u128)?;
        let long_delta = SignedValue::new(rate.sign, increment);
        let short_delta = SignedValue::new(cop.not(rate.sign)?, increment);

        let cumulative_long = signed_value::add(cop, &self.state.cumulative_long, &long_delta)?;
        let cumulative_short = signed_value::add(cop, &self.state.cumulative_short, &short_delta)?;
        cumulative_long.allow(cop, Party::Engine)?;
        cumulative_short.allow(cop, Party::Engine)?;

        self.state.cumulative_long = cumulative_long;
        self.state.cumulative_short = cumulative_short;
        self.state.last_poke = now;

        tracing::debug!("Funding poked: elapsed={}s, at={}", elapsed, now);
        Ok(true)
    }

    /// Recomputes the rate from open-interest skew after accruing under the
    /// current one.
    pub fn set_funding_rate_from_skew<C: Coprocessor + ?Sized>(&mut self, cop: &mut C, now: Timestamp) -> Result<()> {
        self.poke_funding(cop, now)?;
        let rate = self.rate_calculator.rate_from_skew(
            cop,
            self.state.open_interest_long,
            self.state.open_interest_short,
        )?;
        self.install(cop, rate)
    }

    /// Installs an explicit rate, again accruing under the old one first.
    pub fn set_funding_rate<C: Coprocessor + ?Sized>(
        &mut self,
        cop: &mut C,
        now: Timestamp,
        rate: SignedValue,
    ) -> Result<()> {
        self.poke_funding(cop, now)?;
        let rate = signed_value::normalize(cop, &rate)?;
        self.install(cop, rate)
    }

    fn install<C: Coprocessor + ?Sized>(&mut self, cop: &mut C, rate: SignedValue) -> Result<()> {
        rate.allow(cop, Party::Engine)?;
        self.state.rate_per_second = rate;
        crate::observability::metrics::FUNDING_RATE_UPDATES.inc();
        tracing::info!("Funding rate installed at {}", self.state.last_poke);
        Ok(())
    }

    /// Entry snapshot for a new position on `side`.
    pub fn snapshot(&self, side: Side) -> SignedValue {
        self.state.cumulative_for(side)
    }

    /// Funding credited to a position since `entry_funding`:
    /// -size * (cumulative_now - entry_funding) / FUNDING_PRECISION.
    /// Negative when the position owes funding.
    pub fn funding_credit<C: Coprocessor + ?Sized>(
        &self,
        cop: &mut C,
        side: Side,
        size: EUint,
        entry_funding: &SignedValue,
    ) -> Result<SignedValue> {
        let cumulative = self.state.cumulative_for(side);
        let accrued = signed_value::sub(cop, &cumulative, entry_funding)?;
        let owed = cop.mul(accrued.magnitude, size)?;
        let magnitude = cop.div_scalar(owed, FUNDING_PRECISION)?;
        let sign = cop.not(accrued.sign)?;
        signed_value::normalize(cop, &SignedValue::new(sign, magnitude))
    }

    pub fn add_open_interest<C: Coprocessor + ?Sized>(&mut self, cop: &mut C, side: Side, size: EUint) -> Result<()> {
        let current = self.state.open_interest_for(side);
        let updated = cop.add(current, size)?;
        self.store_open_interest(cop, side, updated)
    }

    pub fn remove_open_interest<C: Coprocessor + ?Sized>(&mut self, cop: &mut C, side: Side, size: EUint) -> Result<()> {
        let current = self.state.open_interest_for(side);
        let updated = cop.sub(current, size)?;
        self.store_open_interest(cop, side, updated)
    }

    fn store_open_interest<C: Coprocessor + ?Sized>(&mut self, cop: &mut C, side: Side, value: EUint) -> Result<()> {
        cop.allow(value.into(), Party::Engine)?;
        match side {
            Side::Long => self.state.open_interest_long = value,
            Side::Short => self.state.open_interest_short = value,
        }
        Ok(())
    }

    /// Requests reveals of the rate and both accumulators. Supersedes any
    /// publication still in flight.
    pub fn request_publication<C: Coprocessor + ?Sized>(&mut self, cop: &mut C, now: Timestamp) -> Result<()> {
        self.poke_funding(cop, now)?;
        let pending = PendingFundingPublication {
            rate_per_second: DecryptionGateway::request_signed(cop, &self.state.rate_per_second, now)?,
            cumulative_long: DecryptionGateway::request_signed(cop, &self.state.cumulative_long, now)?,
            cumulative_short: DecryptionGateway::request_signed(cop, &self.state.cumulative_short, now)?,
            as_of: now,
        };
        self.state.pending_publication = Some(pending);
        tracing::info!("Funding publication requested as of {}", now);
        Ok(())
    }

    /// Stores the published values once every reveal has landed; otherwise a
    /// no-op returning `None`.
    pub fn finalize_publication<C: Coprocessor + ?Sized>(&mut self, cop: &C) -> Result<Option<PublishedFunding>> {
        let Some(pending) = self.state.pending_publication else {
            return Ok(None);
        };

        let rate = DecryptionGateway::poll_signed(cop, &pending.rate_per_second)?;
        let long = DecryptionGateway::poll_signed(cop, &pending.cumulative_long)?;
        let short = DecryptionGateway::poll_signed(cop, &pending.cumulative_short)?;

        let (Some(rate_per_second), Some(cumulative_long), Some(cumulative_short)) = (rate, long, short) else {
            return Ok(None);
        };

        let published = PublishedFunding {
            rate_per_second,
            cumulative_long,
            cumulative_short,
            published_at: pending.as_of,
        };
        self.state.published = Some(published);
        self.state.pending_publication = None;

        tracing::info!(
            "Funding published: rate={}, long={}, short={}, as_of={}",
            rate_per_second,
            cumulative_long,
            cumulative_short,
            pending.as_of
        );
        Ok(Some(published))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coprocessor::local::LocalCoprocessor;

    fn signed(cop: &LocalCoprocessor, value: &SignedValue) -> i128 {
        let magnitude = cop.plaintext(value.magnitude).unwrap() as i128;
        if cop.plaintext_bool(value.sign).unwrap() { magnitude } else { -magnitude }
    }

    #[test]
    fn accumulators_mirror_each_other() {
        let mut cop = LocalCoprocessor::new();
        let mut accrual = FundingAccrual::new(&mut cop, FundingConfig::default(), Timestamp(1_000)).unwrap();
        let rate = SignedValue::from_plain(&mut cop, -5);
        accrual.set_funding_rate(&mut cop, Timestamp(1_000), rate).unwrap();
        cop.end_transaction();

        assert!(accrual.poke_funding(&mut cop, Timestamp(1_010)).unwrap());
        assert_eq!(signed(&cop, &accrual.state().cumulative_long), -50);
        assert_eq!(signed(&cop, &accrual.state().cumulative_short), 50);
    }

    #[test]
    fn credit_is_negative_when_the_side_pays() {
        let mut cop = LocalCoprocessor::new();
        let mut accrual = FundingAccrual::new(&mut cop, FundingConfig::default(), Timestamp(0)).unwrap();
        let entry = accrual.snapshot(Side::Long);
        let rate = SignedValue::from_plain(&mut cop, 1_000_000_000_000);  // 1e-6 per second
        accrual.set_funding_rate(&mut cop, Timestamp(0), rate).unwrap();
        accrual.poke_funding(&mut cop, Timestamp(100)).unwrap();

        let size = cop.trivial_encrypt(1_000_000_000);  // $1,000
        let long_credit = accrual.funding_credit(&mut cop, Side::Long, size, &entry).unwrap();
        assert_eq!(signed(&cop, &long_credit), -100_000);  // $0.10

        let short_entry = SignedValue::zero(&mut cop);
        let short_credit = accrual.funding_credit(&mut cop, Side::Short, size, &short_entry).unwrap();
        assert_eq!(signed(&cop, &short_credit), 100_000);
    }

    #[test]
    fn publication_is_a_no_op_until_reveals_land() {
        let mut cop = LocalCoprocessor::new();
        let mut accrual = FundingAccrual::new(&mut cop, FundingConfig::default(), Timestamp(0)).unwrap();
        assert_eq!(accrual.finalize_publication(&cop).unwrap(), None);

        accrual.request_publication(&mut cop, Timestamp(60)).unwrap();
        assert_eq!(accrual.finalize_publication(&cop).unwrap(), None);

        cop.fulfill_reveals();
        let published = accrual.finalize_publication(&cop).unwrap().unwrap();
        assert_eq!(published.published_at, Timestamp(60));
        assert_eq!(published.rate_per_second, 0);
        assert_eq!(accrual.state().published, Some(published));
        assert!(accrual.state().pending_publication.is_none());
    }
}
