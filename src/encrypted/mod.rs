pub mod handle;
pub mod signed_value;
