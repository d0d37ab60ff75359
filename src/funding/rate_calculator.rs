use crate::config::FundingConfig;
use crate::encrypted::handle::EUint;
use crate::encrypted::signed_value::{self, SignedValue};
use crate::error::Result;
use crate::interfaces::coprocessor::Coprocessor;
use crate::SIZE_PRECISION;

pub struct FundingRateCalculator {
    config: FundingConfig,
}

impl FundingRateCalculator {
    pub fn new(config: FundingConfig) -> Self {
        FundingRateCalculator { config }
    }

    /// Per-second rate from open-interest skew.
    /// Formula: rate = sign(long - short) * min(|long - short| * factor / SIZE_PRECISION, max_rate)
    /// A positive rate means longs pay shorts.
    pub fn rate_from_skew<C: Coprocessor + ?Sized>(
        &self,
        cop: &mut C,
        open_interest_long: EUint,
        open_interest_short: EUint,
    ) -> Result<SignedValue> {
        let long = SignedValue::non_negative(cop, open_interest_long);
        let short = SignedValue::non_negative(cop, open_interest_short);
        let skew = signed_value::sub(cop, &long, &short)?;

        let scaled = cop.mul_scalar(skew.magnitude, self.config.funding_factor_x18 as u128)?;
        let raw = cop.div_scalar(scaled, SIZE_PRECISION as u128)?;

        let max_rate = cop.trivial_encrypt(self.config.max_funding_rate_x18 as u128);
        let too_high = cop.lt(max_rate, raw)?;
        let magnitude = cop.select(too_high, max_rate, raw)?;

        signed_value::normalize(cop, &SignedValue::new(skew.sign, magnitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coprocessor::local::LocalCoprocessor;

    fn calculator() -> FundingRateCalculator {
        FundingRateCalculator::new(FundingConfig {
            funding_factor_x18: 10_000,
            max_funding_rate_x18: 1_000_000_000,
            rate_update_interval_secs: 3600,
        })
    }

    #[test]
    fn short_heavy_book_gives_negative_rate() {
        let mut cop = LocalCoprocessor::new();
        let long = cop.trivial_encrypt(1_000_000_000);   // $1,000
        let short = cop.trivial_encrypt(3_000_000_000);  // $3,000

        let rate = calculator().rate_from_skew(&mut cop, long, short).unwrap();
        assert_eq!(cop.plaintext_bool(rate.sign), Some(false));
        assert_eq!(cop.plaintext(rate.magnitude), Some(20_000_000));
    }

    #[test]
    fn rate_is_clamped() {
        let mut cop = LocalCoprocessor::new();
        let long = cop.trivial_encrypt(1_000_000_000_000_000);
        let short = cop.trivial_encrypt(0);

        let rate = calculator().rate_from_skew(&mut cop, long, short).unwrap();
        assert_eq!(cop.plaintext_bool(rate.sign), Some(true));
        assert_eq!(cop.plaintext(rate.magnitude), Some(1_000_000_000));
    }

    #[test]
    fn balanced_book_has_zero_rate() {
        let mut cop = LocalCoprocessor::new();
        let long = cop.trivial_encrypt(5_000_000);
        let short = cop.trivial_encrypt(5_000_000);

        let rate = calculator().rate_from_skew(&mut cop, long, short).unwrap();
        assert_eq!(cop.plaintext_bool(rate.sign), Some(true));
        assert_eq!(cop.plaintext(rate.magnitude), Some(0));
    }
}
