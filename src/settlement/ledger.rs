use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::types::ids::UserId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: u64,
    pub recorded_at: DateTime<Utc>,
    pub entry_type: EntryType,
    pub user_id: UserId,
    pub amount: i128,  // Signed: positive = credit to the user, negative = debit
    pub balance_after: u64,
    pub reference: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    Deposit,
    Debit,
    Credit,
}

#[derive(Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            entries: Vec::new(),
        }
    }

    pub fn record(
        &mut self,
        entry_type: EntryType,
        user_id: UserId,
        amount: i128,
        balance_after: u64,
        reference: &str,
    ) {
        let entry = LedgerEntry {
            entry_id: self.entries.len() as u64,
            recorded_at: Utc::now(),
            entry_type,
            user_id,
            amount,
            balance_after,
            reference: reference.to_string(),
        };
        self.entries.push(entry);
    }

    pub fn entries_for(&self, user_id: UserId) -> Vec<&LedgerEntry> {
        self.entries.iter()
            .filter(|e| e.user_id == user_id)
            .collect()
    }

    /// Replays every entry of `user_id` and compares with `expected`.
    pub fn verify_balance(&self, user_id: UserId, expected: u64) -> bool {
        let calculated: i128 = self.entries.iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.amount)
            .sum();

        calculated == expected as i128
    }
}
