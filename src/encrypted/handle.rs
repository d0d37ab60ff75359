use serde::{Deserialize, Serialize};
use std::fmt;
use crate::types::ids::UserId;

/// Opaque reference to a ciphertext held by the coprocessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handle(pub u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Encrypted 128-bit unsigned integer. Arithmetic on it wraps on overflow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EUint(pub Handle);

/// Encrypted boolean.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EBool(pub Handle);

impl From<EUint> for Handle {
    fn from(value: EUint) -> Handle {
        value.0
    }
}

impl From<EBool> for Handle {
    fn from(value: EBool) -> Handle {
        value.0
    }
}

/// A party the access-control layer can authorize on a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    /// The ledger itself, i.e. the contract executing coprocessor operations.
    Engine,
    User(UserId),
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Engine => write!(f, "engine"),
            Party::User(user_id) => write!(f, "user:{}", user_id),
        }
    }
}
