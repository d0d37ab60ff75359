use thiserror::Error;
use crate::encrypted::handle::Handle;
use crate::interfaces::coprocessor::RevealRequestId;
use crate::types::ids::{PositionId, UserId};
use crate::types::position::PositionStatus;

#[derive(Error, Debug)]
pub enum Error {
    // Coprocessor / ACL Errors
    #[error("Access denied on encrypted handle {handle}")]
    AccessDenied {
        handle: Handle,
    },

    #[error("Unknown encrypted handle: {0}")]
    UnknownHandle(Handle),

    #[error("Handle {handle} is not of type {expected}")]
    HandleTypeMismatch {
        handle: Handle,
        expected: &'static str,
    },

    #[error("Unknown reveal request: {0}")]
    UnknownRevealRequest(RevealRequestId),

    // Position Ledger Errors
    #[error("Position not found: {0}")]
    PositionNotFound(PositionId),

    #[error("Invalid state transition for position {position_id}: cannot {action} from {from:?}")]
    InvalidStateTransition {
        position_id: PositionId,
        from: PositionStatus,
        action: &'static str,
    },

    #[error("Unauthorized: {caller} does not own position {position_id}")]
    Unauthorized {
        position_id: PositionId,
        caller: UserId,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Settlement Errors
    #[error("Insolvency: payout={payout}, pool_balance={pool_balance}")]
    Insolvency {
        payout: u64,
        pool_balance: u64,
    },

    #[error("Account not found: {0}")]
    AccountNotFound(UserId),

    #[error("Insufficient balance: required={required}, available={available}")]
    InsufficientBalance {
        required: u64,
        available: u64,
    },

    // Oracle Errors
    #[error("Stale oracle: {0}")]
    StaleOracle(String),

    // Arithmetic Errors
    #[error("Overflow in {operation}")]
    Overflow { operation: String },

    #[error("Division by zero")]
    DivisionByZero,

    // System Errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid checksum")]
    InvalidChecksum,

    #[error("No snapshot found")]
    NoSnapshotFound,

    #[error("Unsupported snapshot version: {found}, max supported: {max_supported}")]
    UnsupportedSnapshotVersion {
        found: u32,
        max_supported: u32,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn overflow(operation: impl Into<String>) -> Self {
        Error::Overflow { operation: operation.into() }
    }
}
