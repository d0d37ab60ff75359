pub mod accounts;
pub mod balance_manager;
pub mod calculator;
pub mod ledger;
pub mod pool;
