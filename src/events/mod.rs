pub mod base;
pub mod funding;
pub mod liquidation;
pub mod position;
