pub mod balance_provider;
pub mod clock;
pub mod coprocessor;
pub mod oracle;
