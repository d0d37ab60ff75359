use crate::error::Result;
use crate::types::ids::UserId;

/// Token custody. The engine debits collateral on open requests and credits
/// refunds and payouts; it never holds tokens itself.
pub trait BalanceProvider {
    fn balance_of(&self, user_id: UserId) -> Result<u64>;
    fn debit(&mut self, user_id: UserId, amount: u64, reference: &str) -> Result<()>;
    fn credit(&mut self, user_id: UserId, amount: u64, reference: &str) -> Result<()>;
}
