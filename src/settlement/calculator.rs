use crate::error::{Error, Result};
use crate::types::position::Side;
use crate::types::price::Price;
use crate::BPS;

/// Plaintext reconciliation of a position whose reveals have landed.
pub struct SettlementCalculator;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SettlementAmounts {
    pub pnl: i128,
    pub equity: i128,
    pub fee: u64,
    pub payout: u64,
}

impl SettlementCalculator {
    /// PnL of `size` notional between `entry` and `exit`:
    /// size * (exit - entry) / entry, negated for shorts.
    pub fn pnl(side: Side, size: u128, entry: Price, exit: Price) -> Result<i128> {
        if entry.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let (distance, exit_above) = exit.abs_diff(entry);
        let magnitude = size
            .checked_mul(distance as u128)
            .ok_or_else(|| Error::overflow("pnl"))?
            / entry.raw_value() as u128;
        let magnitude = i128::try_from(magnitude).map_err(|_| Error::overflow("pnl"))?;

        let gain = match side {
            Side::Long => exit_above,
            Side::Short => !exit_above,
        };
        Ok(if gain || magnitude == 0 { magnitude } else { -magnitude })
    }

    /// equity = collateral + pnl + funding + impact; payout is the
    /// non-negative part of equity less a basis-point fee.
    pub fn settle(
        collateral: u64,
        pnl: i128,
        funding: i128,
        impact: i128,
        fee_bps: u64,
    ) -> Result<SettlementAmounts> {
        let equity = (collateral as i128)
            .checked_add(pnl)
            .and_then(|e| e.checked_add(funding))
            .and_then(|e| e.checked_add(impact))
            .ok_or_else(|| Error::overflow("equity"))?;

        let gross = u64::try_from(equity.max(0)).map_err(|_| Error::overflow("gross payout"))?;
        let fee = ((gross as u128 * fee_bps as u128) / BPS as u128) as u64;

        Ok(SettlementAmounts {
            pnl,
            equity,
            fee,
            payout: gross - fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_loses_when_price_drops() {
        let pnl = SettlementCalculator::pnl(
            Side::Long,
            1_000_000_000,
            Price::from_units(2_000),
            Price::from_units(1_800),
        ).unwrap();
        assert_eq!(pnl, -100_000_000);

        let short = SettlementCalculator::pnl(
            Side::Short,
            1_000_000_000,
            Price::from_units(2_000),
            Price::from_units(1_800),
        ).unwrap();
        assert_eq!(short, 100_000_000);
    }

    #[test]
    fn payout_is_floored_at_zero() {
        let amounts = SettlementCalculator::settle(50_000_000, -100_000_000, 0, 0, 500).unwrap();
        assert_eq!(amounts.equity, -50_000_000);
        assert_eq!(amounts.fee, 0);
        assert_eq!(amounts.payout, 0);
    }

    #[test]
    fn fee_is_taken_from_gross() {
        let amounts = SettlementCalculator::settle(100_000_000, 20_000_000, -1_000_000, -500_000, 10).unwrap();
        assert_eq!(amounts.equity, 118_500_000);
        assert_eq!(amounts.fee, 118_500);
        assert_eq!(amounts.payout, 118_381_500);
    }
}
