//! [`ChainAccess`] over an alloy provider.

use alloy_consensus::Transaction as _;
use alloy_network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy_primitives::{Address, Bytes, TxHash};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types_eth::{Filter, Log, TransactionRequest};
use url::Url;

use crate::chain::{
    ChainAccess, ChainAccessError, LogFilter, RawLog, ReceiptInfo, TransactionInfo,
    TransactionSubmission,
};

/// A [`ChainAccess`] backed by any alloy [`Provider`].
///
/// Transactions are sent through the provider as-is: the provider must be able
/// to sign for the `from` address, either through a wallet filler or because
/// the node manages the account.
#[derive(Debug, Clone)]
pub struct AlloyChain<P = DynProvider> {
    provider: P,
}

impl<P> AlloyChain<P> {
    /// Wraps a provider.
    pub const fn new(provider: P) -> Self {
        Self { provider }
    }

    /// The wrapped provider.
    pub const fn provider(&self) -> &P {
        &self.provider
    }
}

impl AlloyChain<DynProvider> {
    /// Connects to an HTTP JSON-RPC endpoint, signing with `wallet` when given.
    #[must_use]
    pub fn connect_http(url: Url, wallet: Option<EthereumWallet>) -> Self {
        let provider = match wallet {
            Some(wallet) => ProviderBuilder::new().wallet(wallet).connect_http(url).erased(),
            None => ProviderBuilder::new().connect_http(url).erased(),
        };
        Self::new(provider)
    }
}

fn raw_log(log: Log) -> RawLog {
    RawLog {
        address: log.inner.address,
        topics: log.inner.data.topics().to_vec(),
        data: log.inner.data.data.clone(),
        block_number: log.block_number,
        transaction_hash: log.transaction_hash,
    }
}

impl<P> ChainAccess for AlloyChain<P>
where
    P: Provider<Ethereum> + Send + Sync,
{
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainAccessError> {
        let tx = TransactionRequest::default().with_to(to).with_input(input);
        Ok(self.provider.call(tx).await?)
    }

    async fn send_transaction(&self, tx: TransactionSubmission) -> Result<TxHash, ChainAccessError> {
        let request = TransactionRequest::default()
            .with_from(tx.from)
            .with_to(tx.to)
            .with_input(tx.input)
            .with_value(tx.value);
        let pending = self.provider.send_transaction(request).await?;
        Ok(*pending.tx_hash())
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ChainAccessError> {
        let mut query = Filter::new()
            .address(filter.address)
            .event_signature(filter.event_signature)
            .topic1(filter.topic1)
            .from_block(filter.from_block);
        if let Some(to) = filter.to_block {
            query = query.to_block(to);
        }
        let logs = self.provider.get_logs(&query).await?;
        Ok(logs.into_iter().map(raw_log).collect())
    }

    async fn get_transaction(&self, hash: TxHash) -> Result<Option<TransactionInfo>, ChainAccessError> {
        let tx = self.provider.get_transaction_by_hash(hash).await?;
        Ok(tx.map(|tx| TransactionInfo {
            hash,
            to: tx.to(),
            input: tx.input().clone(),
            block_number: tx.block_number,
        }))
    }

    async fn get_transaction_receipt(&self, hash: TxHash) -> Result<Option<ReceiptInfo>, ChainAccessError> {
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|receipt| ReceiptInfo {
            transaction_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            logs: receipt.inner.logs().iter().cloned().map(raw_log).collect(),
        }))
    }
}
