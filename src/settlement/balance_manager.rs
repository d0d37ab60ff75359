use crate::error::{Error, Result};
use crate::interfaces::balance_provider::BalanceProvider;
use crate::settlement::accounts::Account;
use crate::settlement::ledger::{EntryType, Ledger};
use crate::types::ids::UserId;
use chrono::Utc;
use std::collections::HashMap;

/// In-memory token custody with an audit ledger.
#[derive(Default)]
pub struct BalanceManager {
    pub accounts: HashMap<UserId, Account>,
    pub ledger: Ledger,
}

impl BalanceManager {
    pub fn new() -> Self {
        BalanceManager {
            accounts: HashMap::new(),
            ledger: Ledger::new(),
        }
    }

    pub fn deposit(&mut self, user_id: UserId, amount: u64) -> Result<()> {
        let account = self.accounts.entry(user_id).or_insert_with(|| Account::new(user_id));
        account.balance = account.balance.checked_add(amount)
            .ok_or_else(|| Error::overflow("deposit"))?;
        account.updated_at = Utc::now();
        let balance_after = account.balance;

        self.ledger.record(EntryType::Deposit, user_id, amount as i128, balance_after, "deposit");
        Ok(())
    }
}

impl BalanceProvider for BalanceManager {
    fn balance_of(&self, user_id: UserId) -> Result<u64> {
        self.accounts.get(&user_id)
            .map(|a| a.balance)
            .ok_or(Error::AccountNotFound(user_id))
    }

    fn debit(&mut self, user_id: UserId, amount: u64, reference: &str) -> Result<()> {
        let balance_after;
        {
            let account = self.accounts.get_mut(&user_id)
                .ok_or(Error::AccountNotFound(user_id))?;

            if account.balance < amount {
                return Err(Error::InsufficientBalance {
                    required: amount,
                    available: account.balance,
                });
            }

            account.balance -= amount;
            account.updated_at = Utc::now();
            balance_after = account.balance;
        }

        self.ledger.record(EntryType::Debit, user_id, -(amount as i128), balance_after, reference);
        Ok(())
    }

    fn credit(&mut self, user_id: UserId, amount: u64, reference: &str) -> Result<()> {
        let account = self.accounts.entry(user_id).or_insert_with(|| Account::new(user_id));
        account.balance = account.balance.checked_add(amount)
            .ok_or_else(|| Error::overflow("credit"))?;
        account.updated_at = Utc::now();
        let balance_after = account.balance;

        self.ledger.record(EntryType::Credit, user_id, amount as i128, balance_after, reference);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_replays_to_balance() {
        let mut bank = BalanceManager::new();
        let user = UserId::new();
        bank.deposit(user, 500).unwrap();
        bank.debit(user, 200, "collateral").unwrap();
        bank.credit(user, 50, "payout").unwrap();

        assert_eq!(bank.balance_of(user).unwrap(), 350);
        assert!(bank.ledger.verify_balance(user, 350));
        assert_eq!(bank.ledger.entries_for(user).len(), 3);
    }

    #[test]
    fn debit_beyond_balance_fails() {
        let mut bank = BalanceManager::new();
        let user = UserId::new();
        bank.deposit(user, 10).unwrap();

        assert!(matches!(
            bank.debit(user, 11, "collateral"),
            Err(Error::InsufficientBalance { required: 11, available: 10 })
        ));
        assert!(matches!(bank.debit(UserId::new(), 1, "x"), Err(Error::AccountNotFound(_))));
    }
}
