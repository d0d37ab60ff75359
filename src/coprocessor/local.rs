use std::collections::{HashMap, HashSet};
use crate::encrypted::handle::{EBool, EUint, Handle, Party};
use crate::error::{Error, Result};
use crate::interfaces::coprocessor::{Coprocessor, RevealRequestId};
use crate::types::ids::UserId;

#[derive(Clone, Copy, Debug)]
enum Ciphertext {
    Uint(u128),
    Bool(bool),
}

#[derive(Clone, Copy, Debug)]
struct RevealSlot {
    value: u128,
    ready: bool,
}

/// In-process stand-in for the coprocessor.
///
/// Values are held in plaintext behind opaque handles; the access-control
/// rules and the asynchronous reveal protocol are enforced exactly as the
/// real service would. Reveals only land when [`LocalCoprocessor::fulfill_reveals`]
/// (or `fulfill`) is called, unless the instance was built with
/// [`LocalCoprocessor::with_instant_reveals`].
pub struct LocalCoprocessor {
    values: HashMap<Handle, Ciphertext>,
    persistent: HashSet<(Handle, Party)>,
    transient: HashSet<Handle>,
    reveals: HashMap<RevealRequestId, RevealSlot>,
    next_handle: u64,
    next_request: u64,
    instant_reveals: bool,
}

impl LocalCoprocessor {
    pub fn new() -> Self {
        LocalCoprocessor {
            values: HashMap::new(),
            persistent: HashSet::new(),
            transient: HashSet::new(),
            reveals: HashMap::new(),
            next_handle: 1,
            next_request: 1,
            instant_reveals: false,
        }
    }

    pub fn with_instant_reveals() -> Self {
        LocalCoprocessor {
            instant_reveals: true,
            ..Self::new()
        }
    }

    /// Client-side encryption of a trader input; only `owner` holds it.
    pub fn encrypt_input(&mut self, value: u128, owner: UserId) -> EUint {
        let handle = self.store(Ciphertext::Uint(value));
        self.transient.remove(&handle);
        self.persistent.insert((handle, Party::User(owner)));
        EUint(handle)
    }

    /// Marks every outstanding reveal as landed. Returns how many changed.
    pub fn fulfill_reveals(&mut self) -> usize {
        let mut landed = 0;
        for slot in self.reveals.values_mut().filter(|s| !s.ready) {
            slot.ready = true;
            landed += 1;
        }
        if landed > 0 {
            tracing::debug!("Coprocessor fulfilled {} reveals", landed);
        }
        landed
    }

    pub fn fulfill(&mut self, request: RevealRequestId) -> Result<()> {
        let slot = self.reveals.get_mut(&request)
            .ok_or(Error::UnknownRevealRequest(request))?;
        slot.ready = true;
        Ok(())
    }

    pub fn pending_reveals(&self) -> usize {
        self.reveals.values().filter(|s| !s.ready).count()
    }

    /// Ciphertexts still held, reachable or not.
    pub fn stored_values(&self) -> usize {
        self.values.len()
    }

    /// Reveal slots not yet released.
    pub fn open_reveals(&self) -> usize {
        self.reveals.len()
    }

    /// Debug view of a ciphertext, bypassing access control.
    pub fn plaintext(&self, value: EUint) -> Option<u128> {
        match self.values.get(&value.0) {
            Some(Ciphertext::Uint(v)) => Some(*v),
            _ => None,
        }
    }

    /// Debug view of an encrypted boolean, bypassing access control.
    pub fn plaintext_bool(&self, value: EBool) -> Option<bool> {
        match self.values.get(&value.0) {
            Some(Ciphertext::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    fn store(&mut self, value: Ciphertext) -> Handle {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        self.values.insert(handle, value);
        self.transient.insert(handle);
        handle
    }

    fn engine_allowed(&self, handle: Handle) -> bool {
        self.transient.contains(&handle) || self.persistent.contains(&(handle, Party::Engine))
    }

    fn load(&self, handle: Handle) -> Result<Ciphertext> {
        let Some(value) = self.values.get(&handle) else {
            // Issued earlier and dropped at a transaction boundary.
            if handle.0 < self.next_handle {
                return Err(Error::AccessDenied { handle });
            }
            return Err(Error::UnknownHandle(handle));
        };
        if !self.engine_allowed(handle) {
            tracing::warn!("Coprocessor access denied on {}", handle);
            return Err(Error::AccessDenied { handle });
        }
        Ok(*value)
    }

    fn load_uint(&self, value: EUint) -> Result<u128> {
        match self.load(value.0)? {
            Ciphertext::Uint(v) => Ok(v),
            Ciphertext::Bool(_) => Err(Error::HandleTypeMismatch { handle: value.0, expected: "euint" }),
        }
    }

    fn load_bool(&self, value: EBool) -> Result<bool> {
        match self.load(value.0)? {
            Ciphertext::Bool(v) => Ok(v),
            Ciphertext::Uint(_) => Err(Error::HandleTypeMismatch { handle: value.0, expected: "ebool" }),
        }
    }

    fn uint(&mut self, value: u128) -> EUint {
        EUint(self.store(Ciphertext::Uint(value)))
    }

    fn boolean(&mut self, value: bool) -> EBool {
        EBool(self.store(Ciphertext::Bool(value)))
    }
}

impl Default for LocalCoprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Coprocessor for LocalCoprocessor {
    fn trivial_encrypt(&mut self, value: u128) -> EUint {
        self.uint(value)
    }

    fn trivial_encrypt_bool(&mut self, value: bool) -> EBool {
        self.boolean(value)
    }

    fn verify_input(&mut self, input: EUint, owner: UserId) -> Result<EUint> {
        if !self.persistent.contains(&(input.0, Party::User(owner))) {
            tracing::warn!("Rejected input {} not held by {}", input.0, owner);
            return Err(Error::AccessDenied { handle: input.0 });
        }
        match self.values.get(&input.0) {
            Some(Ciphertext::Uint(_)) => {}
            Some(Ciphertext::Bool(_)) => {
                return Err(Error::HandleTypeMismatch { handle: input.0, expected: "euint" });
            }
            None => return Err(Error::UnknownHandle(input.0)),
        }
        self.transient.insert(input.0);
        Ok(input)
    }

    fn add(&mut self, a: EUint, b: EUint) -> Result<EUint> {
        let (a, b) = (self.load_uint(a)?, self.load_uint(b)?);
        Ok(self.uint(a.wrapping_add(b)))
    }

    fn sub(&mut self, a: EUint, b: EUint) -> Result<EUint> {
        let (a, b) = (self.load_uint(a)?, self.load_uint(b)?);
        Ok(self.uint(a.wrapping_sub(b)))
    }

    fn mul(&mut self, a: EUint, b: EUint) -> Result<EUint> {
        let (a, b) = (self.load_uint(a)?, self.load_uint(b)?);
        Ok(self.uint(a.wrapping_mul(b)))
    }

    fn mul_scalar(&mut self, a: EUint, scalar: u128) -> Result<EUint> {
        let a = self.load_uint(a)?;
        Ok(self.uint(a.wrapping_mul(scalar)))
    }

    fn div_scalar(&mut self, a: EUint, divisor: u128) -> Result<EUint> {
        if divisor == 0 {
            return Err(Error::DivisionByZero);
        }
        let a = self.load_uint(a)?;
        Ok(self.uint(a / divisor))
    }

    fn lt(&mut self, a: EUint, b: EUint) -> Result<EBool> {
        let (a, b) = (self.load_uint(a)?, self.load_uint(b)?);
        Ok(self.boolean(a < b))
    }

    fn eq(&mut self, a: EUint, b: EUint) -> Result<EBool> {
        let (a, b) = (self.load_uint(a)?, self.load_uint(b)?);
        Ok(self.boolean(a == b))
    }

    fn and(&mut self, a: EBool, b: EBool) -> Result<EBool> {
        let (a, b) = (self.load_bool(a)?, self.load_bool(b)?);
        Ok(self.boolean(a && b))
    }

    fn or(&mut self, a: EBool, b: EBool) -> Result<EBool> {
        let (a, b) = (self.load_bool(a)?, self.load_bool(b)?);
        Ok(self.boolean(a || b))
    }

    fn xor(&mut self, a: EBool, b: EBool) -> Result<EBool> {
        let (a, b) = (self.load_bool(a)?, self.load_bool(b)?);
        Ok(self.boolean(a ^ b))
    }

    fn not(&mut self, a: EBool) -> Result<EBool> {
        let a = self.load_bool(a)?;
        Ok(self.boolean(!a))
    }

    fn select(&mut self, cond: EBool, if_true: EUint, if_false: EUint) -> Result<EUint> {
        let cond = self.load_bool(cond)?;
        let (t, f) = (self.load_uint(if_true)?, self.load_uint(if_false)?);
        Ok(self.uint(if cond { t } else { f }))
    }

    fn select_bool(&mut self, cond: EBool, if_true: EBool, if_false: EBool) -> Result<EBool> {
        let cond = self.load_bool(cond)?;
        let (t, f) = (self.load_bool(if_true)?, self.load_bool(if_false)?);
        Ok(self.boolean(if cond { t } else { f }))
    }

    fn allow(&mut self, handle: Handle, party: Party) -> Result<()> {
        self.load(handle)?;
        self.persistent.insert((handle, party));
        Ok(())
    }

    fn is_allowed(&self, handle: Handle, party: Party) -> bool {
        match party {
            Party::Engine => self.engine_allowed(handle),
            Party::User(_) => self.persistent.contains(&(handle, party)),
        }
    }

    /// Ciphertexts nobody was granted persistently are unreachable once
    /// their transient permission lapses, so they are dropped here.
    fn revoke(&mut self, handle: Handle, party: Party) {
        self.persistent.remove(&(handle, party));
        let held = self.transient.contains(&handle)
            || self.persistent.iter().any(|(granted, _)| *granted == handle);
        if !held {
            self.values.remove(&handle);
        }
    }

    fn end_transaction(&mut self) {
        let granted: HashSet<Handle> = self.persistent.iter().map(|(handle, _)| *handle).collect();
        let orphaned: Vec<Handle> = self.transient
            .drain()
            .filter(|handle| !granted.contains(handle))
            .collect();
        for handle in &orphaned {
            self.values.remove(handle);
        }
    }

    fn request_reveal(&mut self, handle: Handle) -> Result<RevealRequestId> {
        let value = match self.load(handle)? {
            Ciphertext::Uint(v) => v,
            Ciphertext::Bool(v) => v as u128,
        };
        let request = RevealRequestId(self.next_request);
        self.next_request += 1;
        self.reveals.insert(request, RevealSlot {
            value,
            ready: self.instant_reveals,
        });
        Ok(request)
    }

    fn try_read_reveal(&self, request: RevealRequestId) -> Result<Option<u128>> {
        let slot = self.reveals.get(&request)
            .ok_or(Error::UnknownRevealRequest(request))?;
        Ok(slot.ready.then_some(slot.value))
    }

    fn release_reveal(&mut self, request: RevealRequestId) {
        self.reveals.remove(&request);
    }
}
