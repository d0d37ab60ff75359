pub mod log;
pub mod snapshot;
pub mod snapshot_manager;
