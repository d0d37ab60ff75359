use serde::{Deserialize, Serialize};
use std::fmt;
use crate::encrypted::handle::{EBool, EUint, Handle, Party};
use crate::error::Result;
use crate::types::ids::UserId;

/// Correlation id for an in-flight reveal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevealRequestId(pub u64);

impl fmt::Display for RevealRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "reveal-{}", self.0)
    }
}

/// The encrypted-computation coprocessor and its access-control layer.
///
/// Every operation is executed on behalf of [`Party::Engine`]: each input
/// handle must be allowed for the engine, either persistently through
/// [`Coprocessor::allow`] or transiently because it was produced earlier in
/// the same transaction. Results are transiently allowed and become inert at
/// [`Coprocessor::end_transaction`] unless persisted.
///
/// Unsigned arithmetic is unchecked and wraps on overflow.
pub trait Coprocessor {
    fn trivial_encrypt(&mut self, value: u128) -> EUint;
    fn trivial_encrypt_bool(&mut self, value: bool) -> EBool;

    /// Accepts a user-supplied ciphertext input. Fails with `AccessDenied`
    /// unless `owner` holds the handle.
    fn verify_input(&mut self, input: EUint, owner: UserId) -> Result<EUint>;

    fn add(&mut self, a: EUint, b: EUint) -> Result<EUint>;
    fn sub(&mut self, a: EUint, b: EUint) -> Result<EUint>;
    fn mul(&mut self, a: EUint, b: EUint) -> Result<EUint>;
    fn mul_scalar(&mut self, a: EUint, scalar: u128) -> Result<EUint>;
    fn div_scalar(&mut self, a: EUint, divisor: u128) -> Result<EUint>;

    fn lt(&mut self, a: EUint, b: EUint) -> Result<EBool>;
    fn eq(&mut self, a: EUint, b: EUint) -> Result<EBool>;

    fn and(&mut self, a: EBool, b: EBool) -> Result<EBool>;
    fn or(&mut self, a: EBool, b: EBool) -> Result<EBool>;
    fn xor(&mut self, a: EBool, b: EBool) -> Result<EBool>;
    fn not(&mut self, a: EBool) -> Result<EBool>;

    fn select(&mut self, cond: EBool, if_true: EUint, if_false: EUint) -> Result<EUint>;
    fn select_bool(&mut self, cond: EBool, if_true: EBool, if_false: EBool) -> Result<EBool>;

    /// Persistently authorizes `party` on `handle`. The engine must itself be
    /// allowed on the handle.
    fn allow(&mut self, handle: Handle, party: Party) -> Result<()>;
    fn is_allowed(&self, handle: Handle, party: Party) -> bool;
    /// Withdraws a persistent grant. A ciphertext left with no grant is gone.
    fn revoke(&mut self, handle: Handle, party: Party);

    /// Drops every transient permission granted during the current call.
    fn end_transaction(&mut self);

    /// Fire-and-forget reveal of a handle the engine is allowed on.
    fn request_reveal(&mut self, handle: Handle) -> Result<RevealRequestId>;

    /// Non-blocking poll. `Ok(None)` while the result has not landed; booleans
    /// read back as 0 or 1. Reading a landed result is idempotent.
    fn try_read_reveal(&self, request: RevealRequestId) -> Result<Option<u128>>;

    /// Forgets a reveal its requester consumed or abandoned. Unknown ids are
    /// ignored.
    fn release_reveal(&mut self, request: RevealRequestId);
}
