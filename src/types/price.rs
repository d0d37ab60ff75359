use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(u64);  // Fixed-point with 8 decimal places

impl Price {
    pub const MULTIPLIER: u64 = crate::PRICE_PRECISION;

    pub fn from_raw(value: u64) -> Self {
        Price(value)
    }

    /// Whole quote units, e.g. `Price::from_units(2_000)` is $2,000.
    pub fn from_units(units: u64) -> Self {
        Price(units * Self::MULTIPLIER)
    }

    pub fn raw_value(&self) -> u64 {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::MULTIPLIER as f64
    }

    pub fn zero() -> Self {
        Price(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Absolute distance between two prices, with `true` when `self >= other`.
    pub fn abs_diff(&self, other: Price) -> (u64, bool) {
        if self.0 >= other.0 {
            (self.0 - other.0, true)
        } else {
            (other.0 - self.0, false)
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.to_f64())
    }
}
