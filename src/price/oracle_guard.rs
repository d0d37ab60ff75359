use crate::error::{Error, Result};
use crate::interfaces::oracle::{OracleRound, PriceOracle};
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

/// Rejects oracle rounds no call may depend on: non-positive prices, rounds
/// older than the configured age, and rounds older than one already used.
pub struct OracleGuard {
    max_age_secs: u64,
    last_round: Option<u64>,
}

impl OracleGuard {
    pub fn new(max_age_secs: u64) -> Self {
        OracleGuard {
            max_age_secs,
            last_round: None,
        }
    }

    pub fn latest(&mut self, oracle: &dyn PriceOracle, now: Timestamp) -> Result<Price> {
        let round = oracle.latest_price()?;
        self.check(&round, now)
    }

    pub fn check(&mut self, round: &OracleRound, now: Timestamp) -> Result<Price> {
        if round.price.is_zero() {
            return self.reject(format!("non-positive price in round {}", round.round_id));
        }

        let age = now.seconds_since(round.updated_at);
        if age > self.max_age_secs {
            return self.reject(format!(
                "round {} is {}s old, max {}s",
                round.round_id, age, self.max_age_secs
            ));
        }

        if let Some(last) = self.last_round {
            if round.round_id < last {
                return self.reject(format!(
                    "round {} precedes already used round {}",
                    round.round_id, last
                ));
            }
        }

        self.last_round = Some(round.round_id);
        Ok(round.price)
    }

    fn reject(&self, reason: String) -> Result<Price> {
        tracing::error!("Oracle rejected: {}", reason);
        crate::observability::metrics::STALE_ORACLE_REJECTIONS.inc();
        Err(Error::StaleOracle(reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::oracle::MockPriceOracle;

    fn round(round_id: u64, price: Price, updated_at: u64) -> OracleRound {
        OracleRound {
            round_id,
            price,
            updated_at: Timestamp(updated_at),
        }
    }

    #[test]
    fn accepts_fresh_round() {
        let mut oracle = MockPriceOracle::new();
        oracle.expect_latest_price()
            .times(1)
            .returning(|| Ok(round(7, Price::from_units(2_000), 1_000)));

        let mut guard = OracleGuard::new(60);
        assert_eq!(guard.latest(&oracle, Timestamp(1_030)).unwrap(), Price::from_units(2_000));
    }

    #[test]
    fn rejects_zero_price_and_old_rounds() {
        let mut oracle = MockPriceOracle::new();
        oracle.expect_latest_price()
            .returning(|| Ok(round(3, Price::zero(), 1_000)));

        let mut guard = OracleGuard::new(60);
        assert!(matches!(guard.latest(&oracle, Timestamp(1_000)), Err(Error::StaleOracle(_))));

        let stale = round(4, Price::from_units(1), 1_000);
        assert!(matches!(guard.check(&stale, Timestamp(1_061)), Err(Error::StaleOracle(_))));
    }

    #[test]
    fn rejects_round_regression_but_allows_reuse() {
        let mut guard = OracleGuard::new(60);
        guard.check(&round(10, Price::from_units(5), 100), Timestamp(100)).unwrap();
        guard.check(&round(10, Price::from_units(5), 100), Timestamp(110)).unwrap();

        let older = round(9, Price::from_units(5), 100);
        assert!(matches!(guard.check(&older, Timestamp(110)), Err(Error::StaleOracle(_))));
    }
}
