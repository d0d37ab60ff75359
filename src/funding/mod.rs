pub mod accrual;
pub mod rate_calculator;
