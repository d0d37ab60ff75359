pub mod manual;
pub mod oracle_guard;
