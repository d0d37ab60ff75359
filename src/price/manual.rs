use std::sync::{Arc, RwLock};
use crate::error::{Error, Result};
use crate::interfaces::oracle::{OracleRound, PriceOracle};
use crate::types::price::Price;
use crate::types::timestamp::Timestamp;

/// Operator-fed oracle. Clones share the same feed.
#[derive(Clone)]
pub struct ManualOracle {
    round: Arc<RwLock<OracleRound>>,
}

impl ManualOracle {
    pub fn new(price: Price, now: Timestamp) -> Self {
        ManualOracle {
            round: Arc::new(RwLock::new(OracleRound {
                round_id: 1,
                price,
                updated_at: now,
            })),
        }
    }

    /// Publishes a new round.
    pub fn set_price(&self, price: Price, now: Timestamp) -> Result<OracleRound> {
        let mut round = self.round.write()
            .map_err(|_| Error::StaleOracle("oracle feed poisoned".to_string()))?;
        *round = OracleRound {
            round_id: round.round_id + 1,
            price,
            updated_at: now,
        };
        tracing::debug!("Oracle round {}: price={}", round.round_id, price);
        Ok(*round)
    }
}

impl PriceOracle for ManualOracle {
    fn latest_price(&self) -> Result<OracleRound> {
        self.round.read()
            .map(|round| *round)
            .map_err(|_| Error::StaleOracle("oracle feed poisoned".to_string()))
    }
}
