//! Event log decoding.
//!
//! Decodes the `Created` and `UpdateBalance` events of the core contract from
//! raw logs. The core contract emits `Created` from two call paths that pad the
//! `data` string differently: when the event is emitted from an internal call
//! the trailing zero padding of the string may be missing from the log data.
//! [`PaddingPolicy::RepairShortPadding`] zero-fills such a tail back to its
//! 32-byte boundary before the log is handed to the ABI decoder. Anything else
//! (too few bytes for the declared length, non-zero padding) is still an error.

use std::borrow::Cow;

use alloy_primitives::{Address, B256, I256, U256};
use alloy_sol_types::SolEvent;
use reqnet::RequestNetworkError;

use crate::chain::RawLog;
use crate::contract::IRequestCore;

/// How to treat a dynamic field whose trailing padding is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingPolicy {
    /// Require the full 32-byte padded length.
    Strict,
    /// Zero-fill missing padding as long as the declared length is present.
    #[default]
    RepairShortPadding,
}

/// Errors raised while decoding an event log.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LogDecodeError {
    /// `topics[0]` is not the event's signature hash.
    #[error("log is not a {event} event: topic0 {actual}")]
    TopicMismatch {
        /// Expected event.
        event: &'static str,
        /// The topic found.
        actual: B256,
    },
    /// The log carries no topics at all.
    #[error("{event} log has no topics")]
    MissingTopic {
        /// Event being decoded.
        event: &'static str,
    },
    /// The data is too short for a field.
    #[error("insufficient data for {field}: needed {needed} bytes, got {available}")]
    InsufficientData {
        /// Field being decoded.
        field: &'static str,
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },
    /// Padding bytes after a dynamic value are not zero.
    #[error("non-empty padding bytes after {field}")]
    NonZeroPadding {
        /// Field being decoded.
        field: &'static str,
    },
    /// An offset or length word points outside any addressable buffer.
    #[error("{kind} of {field} is out of range")]
    OutOfRange {
        /// Field being decoded.
        field: &'static str,
        /// `offset` or `length`.
        kind: &'static str,
    },
    /// The ABI decoder rejected the log.
    #[error("malformed {event} log: {source}")]
    Abi {
        /// Event being decoded.
        event: &'static str,
        /// Decoder error.
        #[source]
        source: alloy_sol_types::Error,
    },
}

impl From<LogDecodeError> for RequestNetworkError {
    fn from(value: LogDecodeError) -> Self {
        Self::MalformedLog(value.to_string())
    }
}

/// Core contract events, with the head slots of their dynamic non-indexed fields.
trait CoreEvent: SolEvent {
    const NAME: &'static str;
    const DYNAMIC_FIELDS: &'static [(usize, &'static str)];
}

impl CoreEvent for IRequestCore::Created {
    const NAME: &'static str = "Created";
    const DYNAMIC_FIELDS: &'static [(usize, &'static str)] = &[(1, "data")];
}

impl CoreEvent for IRequestCore::UpdateBalance {
    const NAME: &'static str = "UpdateBalance";
    const DYNAMIC_FIELDS: &'static [(usize, &'static str)] = &[];
}

/// A decoded `Created` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedEvent {
    /// The new request.
    pub request_id: B256,
    /// Primary payee.
    pub payee: Address,
    /// Payer, possibly the zero address.
    pub payer: Address,
    /// Address that created the request.
    pub creator: Address,
    /// Off-chain data handle; empty when the request has no metadata.
    pub data: String,
}

impl From<IRequestCore::Created> for CreatedEvent {
    fn from(event: IRequestCore::Created) -> Self {
        Self {
            request_id: event.requestId,
            payee: event.payee,
            payer: event.payer,
            creator: event.creator,
            data: event.data,
        }
    }
}

/// A decoded `UpdateBalance` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateBalanceEvent {
    /// The request.
    pub request_id: B256,
    /// Index of the payee whose balance changed.
    pub payee_index: u8,
    /// Signed balance change.
    pub delta_amount: I256,
}

impl From<IRequestCore::UpdateBalance> for UpdateBalanceEvent {
    fn from(event: IRequestCore::UpdateBalance) -> Self {
        Self {
            request_id: event.requestId,
            payee_index: event.payeeIndex,
            delta_amount: event.deltaAmount,
        }
    }
}

/// Decodes core contract logs, repairing short string padding per its [`PaddingPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDecoder {
    policy: PaddingPolicy,
}

impl LogDecoder {
    /// Creates a decoder with the given padding policy.
    #[must_use]
    pub const fn new(policy: PaddingPolicy) -> Self {
        Self { policy }
    }

    /// The padding policy in use.
    #[must_use]
    pub const fn policy(&self) -> PaddingPolicy {
        self.policy
    }

    /// Decodes a `Created` log.
    ///
    /// # Errors
    ///
    /// Returns [`LogDecodeError`] if the log is not a well-formed `Created` event.
    pub fn decode_created(&self, log: &RawLog) -> Result<CreatedEvent, LogDecodeError> {
        self.decode::<IRequestCore::Created>(log).map(CreatedEvent::from)
    }

    /// Decodes an `UpdateBalance` log.
    ///
    /// # Errors
    ///
    /// Returns [`LogDecodeError`] if the log is not a well-formed `UpdateBalance` event.
    pub fn decode_update_balance(&self, log: &RawLog) -> Result<UpdateBalanceEvent, LogDecodeError> {
        self.decode::<IRequestCore::UpdateBalance>(log)
            .map(UpdateBalanceEvent::from)
    }

    fn decode<E: CoreEvent>(&self, log: &RawLog) -> Result<E, LogDecodeError> {
        let topic0 = log
            .topics
            .first()
            .ok_or(LogDecodeError::MissingTopic { event: E::NAME })?;
        if *topic0 != E::SIGNATURE_HASH {
            return Err(LogDecodeError::TopicMismatch {
                event: E::NAME,
                actual: *topic0,
            });
        }
        let data = self.repair_padding(E::DYNAMIC_FIELDS, &log.data)?;
        E::decode_raw_log_validate(log.topics.iter().copied(), &data)
            .map_err(|source| LogDecodeError::Abi { event: E::NAME, source })
    }

    /// Zero-fills the missing padding of dynamic tails that end the data.
    fn repair_padding<'a>(
        &self,
        fields: &[(usize, &'static str)],
        data: &'a [u8],
    ) -> Result<Cow<'a, [u8]>, LogDecodeError> {
        let mut data = Cow::Borrowed(data);
        for &(slot, field) in fields {
            let offset = read_usize(&data, slot * 32, field, "offset")?;
            let length = read_usize(&data, offset, field, "length")?;
            let out_of_range = || LogDecodeError::OutOfRange {
                field,
                kind: "length",
            };
            // read_usize already proved offset + 32 fits
            let start = offset + 32;
            let content_end = start.checked_add(length).ok_or_else(out_of_range)?;
            let padded_end = length
                .checked_next_multiple_of(32)
                .and_then(|padded| start.checked_add(padded))
                .ok_or_else(out_of_range)?;

            let available = data.len();
            if available < content_end {
                return Err(LogDecodeError::InsufficientData {
                    field,
                    needed: content_end,
                    available,
                });
            }
            if available < padded_end && self.policy == PaddingPolicy::Strict {
                return Err(LogDecodeError::InsufficientData {
                    field,
                    needed: padded_end,
                    available,
                });
            }
            let present_end = available.min(padded_end);
            if data[content_end..present_end].iter().any(|b| *b != 0) {
                return Err(LogDecodeError::NonZeroPadding { field });
            }
            if present_end < padded_end {
                data.to_mut().resize(padded_end, 0);
            }
        }
        Ok(data)
    }
}

fn read_usize(
    data: &[u8],
    offset: usize,
    field: &'static str,
    kind: &'static str,
) -> Result<usize, LogDecodeError> {
    let end = offset
        .checked_add(32)
        .ok_or(LogDecodeError::OutOfRange { field, kind: "offset" })?;
    let word = data.get(offset..end).ok_or(LogDecodeError::InsufficientData {
        field,
        needed: end,
        available: data.len(),
    })?;
    usize::try_from(U256::from_be_slice(word)).map_err(|_| LogDecodeError::OutOfRange { field, kind })
}
