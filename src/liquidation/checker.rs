use crate::encrypted::handle::{EBool, EUint};
use crate::encrypted::signed_value::{self, SignedValue};
use crate::error::{Error, Result};
use crate::funding::accrual::FundingAccrual;
use crate::interfaces::coprocessor::Coprocessor;
use crate::types::position::{Position, Side};
use crate::types::price::Price;
use crate::BPS;

/// Encrypted maintenance-margin test.
///
/// Equity here only carries the entry impact. The exit impact of the closing
/// trade is not known until that trade happens, so it is left out.
pub struct LiquidationChecker {
    maintenance_margin_bps: u64,
}

impl LiquidationChecker {
    pub fn new(maintenance_margin_bps: u64) -> Self {
        LiquidationChecker { maintenance_margin_bps }
    }

    /// size * maintenance_margin_bps / BPS
    pub fn required_margin<C: Coprocessor + ?Sized>(&self, cop: &mut C, size: EUint) -> Result<EUint> {
        let scaled = cop.mul_scalar(size, self.maintenance_margin_bps as u128)?;
        cop.div_scalar(scaled, BPS as u128)
    }

    /// size * |mark - entry| / entry. Side and prices are public, so the sign
    /// is decided in plaintext.
    pub fn unrealized_pnl<C: Coprocessor + ?Sized>(
        cop: &mut C,
        position: &Position,
        mark_price: Price,
    ) -> Result<SignedValue> {
        if position.entry_price.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let (distance, mark_above) = mark_price.abs_diff(position.entry_price);
        let gain = match position.side {
            Side::Long => mark_above,
            Side::Short => !mark_above,
        };

        let scaled = cop.mul_scalar(position.size, distance as u128)?;
        let magnitude = cop.div_scalar(scaled, position.entry_price.raw_value() as u128)?;
        let pnl = SignedValue::with_public_sign(cop, gain, magnitude);
        signed_value::normalize(cop, &pnl)
    }

    /// collateral + pnl(mark) + funding credit + entry impact
    pub fn equity<C: Coprocessor + ?Sized>(
        &self,
        cop: &mut C,
        position: &Position,
        mark_price: Price,
        funding: &FundingAccrual,
    ) -> Result<SignedValue> {
        let collateral = cop.trivial_encrypt(position.collateral as u128);
        let collateral = SignedValue::non_negative(cop, collateral);
        let pnl = Self::unrealized_pnl(cop, position, mark_price)?;
        let funding_credit = funding.funding_credit(cop, position.side, position.size, &position.entry_funding)?;

        let equity = signed_value::add(cop, &collateral, &pnl)?;
        let equity = signed_value::add(cop, &equity, &funding_credit)?;
        signed_value::add(cop, &equity, &position.entry_impact)
    }

    /// select(equity.sign, equity.magnitude < required, true): negative
    /// equity is always flagged without ever forming a negative ciphertext.
    pub fn liquidation_flag<C: Coprocessor + ?Sized>(
        &self,
        cop: &mut C,
        position: &Position,
        mark_price: Price,
        funding: &FundingAccrual,
    ) -> Result<EBool> {
        let required = self.required_margin(cop, position.size)?;
        let equity = self.equity(cop, position, mark_price, funding)?;
        let below_margin = cop.lt(equity.magnitude, required)?;
        let flagged = cop.trivial_encrypt_bool(true);
        cop.select_bool(equity.sign, below_margin, flagged)
    }
}
