//! Blockchain access boundary.
//!
//! [`ChainAccess`] is everything the request reader and the service need from
//! an Ethereum node: read-only calls, fire-and-forget transaction submission,
//! log queries and transaction lookups. [`AlloyChain`](crate::provider::AlloyChain)
//! implements it over an alloy provider; tests use an in-memory chain.
//!
//! Nothing here retries or times out. Those concerns belong to the transport
//! the implementation is built on.

use std::future::Future;

use alloy_primitives::{Address, B256, Bytes, TxHash, U256};
use alloy_sol_types::SolCall;
use alloy_transport::TransportError;
use reqnet::RequestNetworkError;

/// A raw event log as returned by `eth_getLogs` or a receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Emitting contract.
    pub address: Address,
    /// Topics; `topics[0]` is the event signature hash.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed arguments.
    pub data: Bytes,
    /// Block the log was emitted in.
    pub block_number: Option<u64>,
    /// Transaction that emitted the log.
    pub transaction_hash: Option<TxHash>,
}

/// Log query over one contract, one event and one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFilter {
    /// Emitting contract.
    pub address: Address,
    /// Event signature hash (`topics[0]`).
    pub event_signature: B256,
    /// First indexed argument (`topics[1]`), the request ID.
    pub topic1: B256,
    /// First block of the range.
    pub from_block: u64,
    /// Last block of the range; `None` means the chain tip.
    pub to_block: Option<u64>,
}

impl LogFilter {
    /// Whether `log` falls within this filter.
    #[must_use]
    pub fn matches(&self, log: &RawLog) -> bool {
        let in_range = log.block_number.is_none_or(|b| {
            b >= self.from_block && self.to_block.is_none_or(|to| b <= to)
        });
        log.address == self.address
            && log.topics.first() == Some(&self.event_signature)
            && log.topics.get(1) == Some(&self.topic1)
            && in_range
    }
}

/// A transaction to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSubmission {
    /// Sending account.
    pub from: Address,
    /// Target contract.
    pub to: Address,
    /// ABI-encoded call.
    pub input: Bytes,
    /// Wei sent along with the call.
    pub value: U256,
}

/// The fields of a mined or pending transaction the reader needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionInfo {
    /// Transaction hash.
    pub hash: TxHash,
    /// Called contract, `None` for a deployment.
    pub to: Option<Address>,
    /// Call input.
    pub input: Bytes,
    /// Block the transaction was included in, `None` while pending.
    pub block_number: Option<u64>,
}

/// The fields of a transaction receipt the reader needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptInfo {
    /// Transaction hash.
    pub transaction_hash: TxHash,
    /// Block the transaction was included in.
    pub block_number: Option<u64>,
    /// Logs emitted by the transaction, in emission order.
    pub logs: Vec<RawLog>,
}

/// Errors raised by a [`ChainAccess`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum ChainAccessError {
    /// RPC transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A call returned data that does not match the function's return types.
    #[error("failed to decode {function} return data: {source}")]
    Decode {
        /// Solidity signature of the called function.
        function: &'static str,
        /// Underlying ABI error.
        source: alloy_sol_types::Error,
    },
    /// Any other failure reported by the chain access implementation.
    #[error("{0}")]
    Other(String),
}

impl From<ChainAccessError> for RequestNetworkError {
    fn from(value: ChainAccessError) -> Self {
        Self::Chain(value.to_string())
    }
}

/// Read and write access to an Ethereum node.
pub trait ChainAccess: Send + Sync {
    /// Executes a read-only call and returns the raw return data.
    fn call(&self, to: Address, input: Bytes) -> impl Future<Output = Result<Bytes, ChainAccessError>> + Send;

    /// Submits a transaction and returns its hash without waiting for inclusion.
    fn send_transaction(
        &self,
        tx: TransactionSubmission,
    ) -> impl Future<Output = Result<TxHash, ChainAccessError>> + Send;

    /// Returns logs matching `filter`, in emission order.
    fn get_logs(&self, filter: &LogFilter) -> impl Future<Output = Result<Vec<RawLog>, ChainAccessError>> + Send;

    /// Looks a transaction up by hash.
    fn get_transaction(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<TransactionInfo>, ChainAccessError>> + Send;

    /// Looks a transaction receipt up by hash.
    fn get_transaction_receipt(
        &self,
        hash: TxHash,
    ) -> impl Future<Output = Result<Option<ReceiptInfo>, ChainAccessError>> + Send;
}

/// Calls a contract function and decodes its return value.
///
/// # Errors
///
/// Returns [`ChainAccessError`] if the call fails or its return data does not decode.
pub async fn call_function<C, F>(chain: &C, to: Address, call: &F) -> Result<F::Return, ChainAccessError>
where
    C: ChainAccess,
    F: SolCall + Sync,
{
    let output = chain.call(to, call.abi_encode().into()).await?;
    F::abi_decode_returns(&output).map_err(|source| ChainAccessError::Decode {
        function: F::SIGNATURE,
        source,
    })
}
