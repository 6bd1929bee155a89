//! Error taxonomy for Request Network operations.
//!
//! Every failure carries the identifier or value that caused it, so a caller
//! can diagnose it without re-tracing the call sequence. Nothing in this
//! workspace retries: errors surface immediately.

use crate::packed::EncodingError;

/// Base error type for Request Network operations.
#[derive(Debug, thiserror::Error)]
pub enum RequestNetworkError {
    /// Malformed or invalid input shape or values.
    #[error("invalid request parameters: {0}")]
    InvalidRequestParameters(String),

    /// The core contract reports the zero-address payer for this request.
    #[error("request {request_id} not found on core contract {core_contract}")]
    RequestNotFound {
        /// The request identifier that was looked up.
        request_id: String,
        /// The core contract derived from the identifier.
        core_contract: String,
    },

    /// No transaction exists for the given identifier.
    #[error("transaction {0} not found")]
    TransactionNotFound(String),

    /// No contract metadata exists for a network and name or address.
    #[error("could not find artifact for \"{name}\" on {network} network")]
    ArtifactNotFound {
        /// Network the lookup was made for.
        network: String,
        /// Contract name or address that was looked up.
        name: String,
    },

    /// An event log could not be decoded, even after padding repair.
    #[error("malformed log: {0}")]
    MalformedLog(String),

    /// No creation event was found for the request.
    #[error("could not find creation event for {0}")]
    MissingCreationEvent(String),

    /// More than one creation event was found for the request.
    #[error("found {count} creation events for request {request_id}")]
    AmbiguousCreationEvent {
        /// The request identifier.
        request_id: String,
        /// How many creation events matched.
        count: usize,
    },

    /// The currency has no contract policy.
    #[error("{0} is not a supported currency")]
    UnsupportedCurrency(String),

    /// The operation is not implemented for this role.
    #[error("{0}")]
    RoleNotSupported(String),

    /// No signing key is bound to the identity.
    #[error("no signing key bound to {0}")]
    SigningKeyNotFound(String),

    /// A bound signing key failed to produce a signature.
    #[error("signing failed: {0}")]
    Signing(String),

    /// The recorded payment deltas of a payee do not fit in an `int256`.
    #[error("payments to payee {0} overflow int256")]
    PaymentOverflow(usize),

    /// The content-addressed store could not return a document.
    #[error("failed to fetch content {handle}: {reason}")]
    ContentFetchFailed {
        /// The off-chain data handle.
        handle: String,
        /// Underlying failure.
        reason: String,
    },

    /// The content-addressed store could not store a document.
    #[error("failed to store content: {0}")]
    ContentStoreFailed(String),

    /// Canonical encoding failed.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// The blockchain access collaborator failed (transport or contract error).
    #[error("chain access failed: {0}")]
    Chain(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RequestNetworkError {
    /// Creates an [`InvalidRequestParameters`](Self::InvalidRequestParameters) error.
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRequestParameters(reason.into())
    }
}
