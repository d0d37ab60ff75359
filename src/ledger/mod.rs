pub mod position_ledger;
