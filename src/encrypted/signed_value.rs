use serde::{Deserialize, Serialize};
use crate::encrypted::handle::{EBool, EUint, Handle, Party};
use crate::error::{Error, Result};
use crate::interfaces::coprocessor::Coprocessor;

/// Signed quantity over an unsigned encrypted integer.
///
/// `sign == true` means non-negative. The pair travels as a unit: nothing in
/// this module ever looks at one half without the other, and no combination
/// is chosen by branching on a ciphertext. Every candidate result is computed
/// and the coprocessor's `select` picks one, so the execution trace is the
/// same whatever the operands are.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedValue {
    pub sign: EBool,
    pub magnitude: EUint,
}

impl SignedValue {
    pub fn new(sign: EBool, magnitude: EUint) -> Self {
        SignedValue { sign, magnitude }
    }

    /// Encrypts a public signed constant.
    pub fn from_plain<C: Coprocessor + ?Sized>(cop: &mut C, value: i128) -> Self {
        SignedValue {
            sign: cop.trivial_encrypt_bool(value >= 0),
            magnitude: cop.trivial_encrypt(value.unsigned_abs()),
        }
    }

    pub fn zero<C: Coprocessor + ?Sized>(cop: &mut C) -> Self {
        Self::from_plain(cop, 0)
    }

    /// Lifts an encrypted unsigned value with a positive sign.
    pub fn non_negative<C: Coprocessor + ?Sized>(cop: &mut C, magnitude: EUint) -> Self {
        SignedValue {
            sign: cop.trivial_encrypt_bool(true),
            magnitude,
        }
    }

    /// Lifts an encrypted magnitude with a sign known in plaintext.
    pub fn with_public_sign<C: Coprocessor + ?Sized>(cop: &mut C, non_negative: bool, magnitude: EUint) -> Self {
        SignedValue {
            sign: cop.trivial_encrypt_bool(non_negative),
            magnitude,
        }
    }

    pub fn handles(&self) -> [Handle; 2] {
        [self.sign.into(), self.magnitude.into()]
    }

    /// Persists both halves for `party` so the value outlives this call.
    pub fn allow<C: Coprocessor + ?Sized>(&self, cop: &mut C, party: Party) -> Result<()> {
        for handle in self.handles() {
            cop.allow(handle, party)?;
        }
        Ok(())
    }
}

/// Flips the sign bit, magnitude unchanged.
pub fn negate<C: Coprocessor + ?Sized>(cop: &mut C, a: &SignedValue) -> Result<SignedValue> {
    Ok(SignedValue {
        sign: cop.not(a.sign)?,
        magnitude: a.magnitude,
    })
}

/// Signed addition.
///
/// Same signs: magnitudes add and the sign carries over. Opposite signs: the
/// non-wrapping one of `|a|-|b|` and `|b|-|a|` is kept and the sign follows
/// the larger magnitude. Equal magnitudes cancel to zero, and zero always
/// carries sign `true`.
pub fn add<C: Coprocessor + ?Sized>(cop: &mut C, a: &SignedValue, b: &SignedValue) -> Result<SignedValue> {
    let sum = cop.add(a.magnitude, b.magnitude)?;
    let a_minus_b = cop.sub(a.magnitude, b.magnitude)?;
    let b_minus_a = cop.sub(b.magnitude, a.magnitude)?;

    let a_lt_b = cop.lt(a.magnitude, b.magnitude)?;
    let b_lt_a = cop.lt(b.magnitude, a.magnitude)?;
    let signs_differ = cop.xor(a.sign, b.sign)?;

    let difference = cop.select(a_lt_b, b_minus_a, a_minus_b)?;
    let positive = cop.trivial_encrypt_bool(true);
    let larger_sign_or_a = cop.select_bool(b_lt_a, a.sign, positive)?;
    let difference_sign = cop.select_bool(a_lt_b, b.sign, larger_sign_or_a)?;

    let magnitude = cop.select(signs_differ, difference, sum)?;
    let sign = cop.select_bool(signs_differ, difference_sign, a.sign)?;

    normalize(cop, &SignedValue { sign, magnitude })
}

pub fn sub<C: Coprocessor + ?Sized>(cop: &mut C, a: &SignedValue, b: &SignedValue) -> Result<SignedValue> {
    let negated = negate(cop, b)?;
    add(cop, a, &negated)
}

/// Encrypted `a < b`, computed as "`b - a` is positive and non-zero".
pub fn lt<C: Coprocessor + ?Sized>(cop: &mut C, a: &SignedValue, b: &SignedValue) -> Result<EBool> {
    let difference = sub(cop, b, a)?;
    let zero = cop.trivial_encrypt(0);
    let is_zero = cop.eq(difference.magnitude, zero)?;
    let non_zero = cop.not(is_zero)?;
    cop.and(difference.sign, non_zero)
}

/// Multiplies the magnitude by `numerator / denominator`, keeping the sign.
pub fn scale<C: Coprocessor + ?Sized>(
    cop: &mut C,
    a: &SignedValue,
    numerator: u128,
    denominator: u128,
) -> Result<SignedValue> {
    if denominator == 0 {
        return Err(Error::DivisionByZero);
    }
    let widened = cop.mul_scalar(a.magnitude, numerator)?;
    let magnitude = cop.div_scalar(widened, denominator)?;
    normalize(cop, &SignedValue { sign: a.sign, magnitude })
}

/// Rewrites a zero magnitude to sign `true` so zero has one encoding.
pub fn normalize<C: Coprocessor + ?Sized>(cop: &mut C, a: &SignedValue) -> Result<SignedValue> {
    let zero = cop.trivial_encrypt(0);
    let is_zero = cop.eq(a.magnitude, zero)?;
    Ok(SignedValue {
        sign: cop.or(a.sign, is_zero)?,
        magnitude: a.magnitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coprocessor::local::LocalCoprocessor;

    fn reveal(cop: &LocalCoprocessor, value: &SignedValue) -> (bool, u128) {
        (
            cop.plaintext_bool(value.sign).unwrap(),
            cop.plaintext(value.magnitude).unwrap(),
        )
    }

    #[test]
    fn opposite_equal_magnitudes_cancel_to_positive_zero() {
        let mut cop = LocalCoprocessor::new();
        let a = SignedValue::from_plain(&mut cop, -42);
        let b = SignedValue::from_plain(&mut cop, 42);

        let ab = add(&mut cop, &a, &b).unwrap();
        let ba = add(&mut cop, &b, &a).unwrap();
        assert_eq!(reveal(&cop, &ab), (true, 0));
        assert_eq!(reveal(&cop, &ba), (true, 0));
    }

    #[test]
    fn negative_zero_is_normalized() {
        let mut cop = LocalCoprocessor::new();
        let zero = SignedValue::from_plain(&mut cop, 0);
        let negative_zero = negate(&mut cop, &zero).unwrap();

        let sum = add(&mut cop, &negative_zero, &negative_zero).unwrap();
        assert_eq!(reveal(&cop, &sum), (true, 0));
    }

    #[test]
    fn larger_magnitude_decides_sign() {
        let mut cop = LocalCoprocessor::new();
        let a = SignedValue::from_plain(&mut cop, 10);
        let b = SignedValue::from_plain(&mut cop, -11);

        let sum = add(&mut cop, &a, &b).unwrap();
        let difference = sub(&mut cop, &a, &b).unwrap();
        assert_eq!(reveal(&cop, &sum), (false, 1));
        assert_eq!(reveal(&cop, &difference), (true, 21));
    }

    #[test]
    fn less_than_handles_mixed_signs() {
        let mut cop = LocalCoprocessor::new();
        let minus_five = SignedValue::from_plain(&mut cop, -5);
        let three = SignedValue::from_plain(&mut cop, 3);
        let zero = SignedValue::zero(&mut cop);
        let negative_zero = negate(&mut cop, &zero).unwrap();

        let r = lt(&mut cop, &minus_five, &three).unwrap();
        assert!(cop.plaintext_bool(r).unwrap());
        let r = lt(&mut cop, &three, &minus_five).unwrap();
        assert!(!cop.plaintext_bool(r).unwrap());
        let r = lt(&mut cop, &negative_zero, &zero).unwrap();
        assert!(!cop.plaintext_bool(r).unwrap());
    }

    #[test]
    fn scale_rejects_zero_denominator() {
        let mut cop = LocalCoprocessor::new();
        let a = SignedValue::from_plain(&mut cop, -300);
        assert!(matches!(scale(&mut cop, &a, 1, 0), Err(Error::DivisionByZero)));

        let scaled = scale(&mut cop, &a, 2, 3).unwrap();
        assert_eq!(reveal(&cop, &scaled), (false, 200));
    }
}
