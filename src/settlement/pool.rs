use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Liquidity backing every payout. Collateral waits in `escrow` until its
/// position opens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPool {
    pub balance: u64,
    pub escrow: u64,
    pub collected_fees: u64,
}

impl LiquidityPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_liquidity(&mut self, amount: u64) -> Result<()> {
        self.balance = self.balance.checked_add(amount)
            .ok_or_else(|| Error::overflow("pool liquidity"))?;
        tracing::info!("Pool liquidity added: {}, balance={}", amount, self.balance);
        self.publish_balance();
        Ok(())
    }

    pub fn escrow_collateral(&mut self, amount: u64) -> Result<()> {
        self.escrow = self.escrow.checked_add(amount)
            .ok_or_else(|| Error::overflow("collateral escrow"))?;
        Ok(())
    }

    /// Moves escrowed collateral into the pool when its position opens.
    pub fn commit_collateral(&mut self, amount: u64) -> Result<()> {
        self.take_escrow(amount)?;
        self.balance = self.balance.checked_add(amount)
            .ok_or_else(|| Error::overflow("pool liquidity"))?;
        self.publish_balance();
        Ok(())
    }

    /// Hands escrowed collateral back for a refund.
    pub fn release_escrow(&mut self, amount: u64) -> Result<()> {
        self.take_escrow(amount)
    }

    /// Checks a payout against the balance without mutating anything.
    pub fn ensure_solvent(&self, payout: u64) -> Result<()> {
        if payout > self.balance {
            tracing::error!(
                "Pool insolvent: payout={}, balance={}",
                payout,
                self.balance
            );
            return Err(Error::Insolvency {
                payout,
                pool_balance: self.balance,
            });
        }
        Ok(())
    }

    /// Debits a payout. The fee stays in the pool and is only tallied.
    pub fn pay_out(&mut self, payout: u64, fee: u64) -> Result<()> {
        self.ensure_solvent(payout)?;
        self.balance -= payout;
        self.collected_fees = self.collected_fees.saturating_add(fee);
        self.publish_balance();
        Ok(())
    }

    fn take_escrow(&mut self, amount: u64) -> Result<()> {
        if amount > self.escrow {
            return Err(Error::InsufficientBalance {
                required: amount,
                available: self.escrow,
            });
        }
        self.escrow -= amount;
        Ok(())
    }

    fn publish_balance(&self) {
        crate::observability::metrics::POOL_BALANCE.set(self.balance.min(i64::MAX as u64) as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payout_never_exceeds_balance() {
        let mut pool = LiquidityPool::new();
        pool.add_liquidity(1_000).unwrap();

        assert!(matches!(
            pool.pay_out(1_001, 0),
            Err(Error::Insolvency { payout: 1_001, pool_balance: 1_000 })
        ));
        assert_eq!(pool.balance, 1_000);

        pool.pay_out(900, 10).unwrap();
        assert_eq!(pool.balance, 100);
        assert_eq!(pool.collected_fees, 10);
    }

    #[test]
    fn escrow_moves_into_balance_on_commit() {
        let mut pool = LiquidityPool::new();
        pool.escrow_collateral(300).unwrap();
        pool.commit_collateral(200).unwrap();
        pool.release_escrow(100).unwrap();

        assert_eq!(pool.escrow, 0);
        assert_eq!(pool.balance, 200);
        assert!(pool.release_escrow(1).is_err());
    }
}
