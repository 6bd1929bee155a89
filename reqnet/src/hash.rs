//! Request hashing.
//!
//! The signing hash is `keccak256` over the packed preimage described in
//! [`packed::request_hash_fields`]. A freshly signed request never has a payer,
//! and the contract never stores the expiration date, so comparing a signed
//! request to one retrieved from chain needs the payer dropped and the
//! expiration supplied again. [`HashMode`] makes that normalization explicit.

use alloy_primitives::{B256, Bytes, keccak256};

use crate::packed::{self, EncodingError};
use crate::timestamp::UnixTimestamp;
use crate::types::Request;

/// How the payer and the expiration date enter the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashMode {
    /// Hash as the payee signs it: no payer, caller-supplied expiration.
    Signing {
        /// Expiration date of the signature.
        expiration: UnixTimestamp,
    },
    /// Hash a stored or retrieved request for comparison.
    Verification {
        /// Pack the zero address even when the request has a payer.
        ignore_payer: bool,
        /// Overrides the request's own expiration date.
        expiration: Option<UnixTimestamp>,
    },
}

impl HashMode {
    /// Verification mode that compares a retrieved request to its signed form.
    #[must_use]
    pub const fn against_signed(expiration: UnixTimestamp) -> Self {
        Self::Verification {
            ignore_payer: true,
            expiration: Some(expiration),
        }
    }
}

/// Computes the canonical hash of a request.
///
/// # Errors
///
/// Returns [`EncodingError::EmptyPayees`] for a request with no payees,
/// [`EncodingError::MissingField`] when no expiration date is available and
/// [`EncodingError::Overflow`] when the data handle is longer than 255 bytes.
pub fn hash_request(request: &Request, mode: HashMode) -> Result<B256, EncodingError> {
    let (payer, expiration) = match mode {
        HashMode::Signing { expiration } => (None, expiration),
        HashMode::Verification {
            ignore_payer,
            expiration,
        } => {
            let payer = if ignore_payer { None } else { request.payer };
            let expiration = expiration
                .or(request.expiration_date)
                .ok_or(EncodingError::MissingField("expiration date"))?;
            (payer, expiration)
        }
    };
    let fields = packed::request_hash_fields(
        request.currency_contract_address,
        &request.payees,
        payer,
        request.data_handle.as_deref(),
        expiration.as_secs(),
    )?;
    Ok(keccak256(packed::encode_packed(&fields)?))
}

/// Encodes the request body passed as `_requestData` when broadcasting a
/// signed request. The payer is always packed as the zero address.
///
/// # Errors
///
/// Returns [`EncodingError`] under the same conditions as [`hash_request`].
pub fn request_body(request: &Request) -> Result<Bytes, EncodingError> {
    let fields =
        packed::request_body_fields(&request.payees, None, request.data_handle.as_deref())?;
    Ok(packed::encode_packed(&fields)?.into())
}
