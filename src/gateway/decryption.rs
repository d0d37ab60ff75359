use serde::{Deserialize, Serialize};
use crate::encrypted::handle::{EBool, Handle, Party};
use crate::encrypted::signed_value::SignedValue;
use crate::error::{Error, Result};
use crate::interfaces::coprocessor::Coprocessor;
use crate::types::timestamp::Timestamp;

pub use crate::interfaces::coprocessor::RevealRequestId;

/// Correlation between a ciphertext and its eventual plaintext. Owned by the
/// record that issued it and dropped once consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDecryptRequest {
    pub handle: Handle,
    pub request: RevealRequestId,
    pub requested_at: Timestamp,
}

/// Both halves of a [`SignedValue`] in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSignedReveal {
    pub sign: PendingDecryptRequest,
    pub magnitude: PendingDecryptRequest,
}

/// Two-phase reveal over the coprocessor: `request*` returns immediately,
/// `poll*` returns `None` until the result lands and may be called any number
/// of times afterwards.
pub struct DecryptionGateway;

impl DecryptionGateway {
    pub fn request<C: Coprocessor + ?Sized>(
        cop: &mut C,
        handle: impl Into<Handle>,
        now: Timestamp,
    ) -> Result<PendingDecryptRequest> {
        let handle = handle.into();
        let request = cop.request_reveal(handle)?;

        crate::observability::metrics::REVEALS_REQUESTED.inc();
        tracing::debug!("Reveal requested: handle={}, request={}", handle, request);

        Ok(PendingDecryptRequest {
            handle,
            request,
            requested_at: now,
        })
    }

    pub fn request_signed<C: Coprocessor + ?Sized>(
        cop: &mut C,
        value: &SignedValue,
        now: Timestamp,
    ) -> Result<PendingSignedReveal> {
        Ok(PendingSignedReveal {
            sign: Self::request(cop, value.sign, now)?,
            magnitude: Self::request(cop, value.magnitude, now)?,
        })
    }

    pub fn request_flag<C: Coprocessor + ?Sized>(
        cop: &mut C,
        flag: EBool,
        now: Timestamp,
    ) -> Result<PendingDecryptRequest> {
        Self::request(cop, flag, now)
    }

    pub fn poll<C: Coprocessor + ?Sized>(
        cop: &C,
        pending: &PendingDecryptRequest,
    ) -> Result<Option<u128>> {
        cop.try_read_reveal(pending.request)
    }

    pub fn poll_bool<C: Coprocessor + ?Sized>(
        cop: &C,
        pending: &PendingDecryptRequest,
    ) -> Result<Option<bool>> {
        Ok(Self::poll(cop, pending)?.map(|v| v != 0))
    }

    pub fn release<C: Coprocessor + ?Sized>(cop: &mut C, pending: &PendingDecryptRequest) {
        cop.release_reveal(pending.request);
    }

    pub fn release_signed<C: Coprocessor + ?Sized>(cop: &mut C, pending: &PendingSignedReveal) {
        Self::release(cop, &pending.sign);
        Self::release(cop, &pending.magnitude);
    }

    /// Releases the reveal and the engine's hold on the ciphertext behind it,
    /// for values computed only to be revealed.
    pub fn discard<C: Coprocessor + ?Sized>(cop: &mut C, pending: &PendingDecryptRequest) {
        Self::release(cop, pending);
        cop.revoke(pending.handle, Party::Engine);
    }

    /// Ready only once both halves have landed.
    pub fn poll_signed<C: Coprocessor + ?Sized>(
        cop: &C,
        pending: &PendingSignedReveal,
    ) -> Result<Option<i128>> {
        let sign = Self::poll_bool(cop, &pending.sign)?;
        let magnitude = Self::poll(cop, &pending.magnitude)?;

        match (sign, magnitude) {
            (Some(non_negative), Some(magnitude)) => {
                let magnitude = i128::try_from(magnitude)
                    .map_err(|_| Error::overflow("signed reveal"))?;
                Ok(Some(if non_negative { magnitude } else { -magnitude }))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coprocessor::local::LocalCoprocessor;

    #[test]
    fn signed_reveal_waits_for_both_halves() {
        let mut cop = LocalCoprocessor::new();
        let value = SignedValue::from_plain(&mut cop, -1_250);
        let pending = DecryptionGateway::request_signed(&mut cop, &value, Timestamp(10)).unwrap();

        assert_eq!(DecryptionGateway::poll_signed(&cop, &pending).unwrap(), None);

        cop.fulfill(pending.sign.request).unwrap();
        assert_eq!(DecryptionGateway::poll_signed(&cop, &pending).unwrap(), None);

        cop.fulfill(pending.magnitude.request).unwrap();
        assert_eq!(DecryptionGateway::poll_signed(&cop, &pending).unwrap(), Some(-1_250));
        assert_eq!(DecryptionGateway::poll_signed(&cop, &pending).unwrap(), Some(-1_250));
    }

    #[test]
    fn magnitude_beyond_i128_is_an_overflow() {
        let mut cop = LocalCoprocessor::with_instant_reveals();
        let value = SignedValue {
            sign: cop.trivial_encrypt_bool(true),
            magnitude: cop.trivial_encrypt(u128::MAX),
        };
        let pending = DecryptionGateway::request_signed(&mut cop, &value, Timestamp(0)).unwrap();
        assert!(matches!(
            DecryptionGateway::poll_signed(&cop, &pending),
            Err(Error::Overflow { .. })
        ));
    }
}
