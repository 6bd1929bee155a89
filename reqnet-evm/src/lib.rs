#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Ethereum support for the Request Network invoicing protocol.
//!
//! This crate talks to the Request contracts: it creates requests as the payee
//! or the payer, signs requests off chain so a payer can broadcast them later,
//! and reconstructs requests from contract storage and event logs.
//!
//! # Features
//!
//! - **Currency Policies**: Ether through `RequestEthereum`, ERC-20 tokens through
//!   their `RequestERC20` contract
//! - **Signed Requests**: EIP-191 signatures over the canonical request hash,
//!   compatible with web3 `sign`
//! - **Log Repair**: Decodes `Created` logs whose string padding was truncated
//!   by the emitting contract
//! - **Concurrent Reads**: Sub-payee lookups and log queries run in parallel
//!
//! # Architecture
//!
//! - [`chain`] - Blockchain access trait and its plain-data log and transaction types
//! - [`contract`] - Solidity bindings for the core and currency contracts
//! - [`logs`] - Event log decoding with a configurable padding policy
//! - [`policy`] - Currency dispatch, calldata building and request validation
//! - [`provider`] - Blockchain access over an alloy provider
//! - [`reader`] - Request reconstruction
//! - [`service`] - The [`RequestNetwork`] facade
//! - [`signer`] - Signing capability and signature verification
//!
//! # Feature Flags
//!
//! - `telemetry` - `tracing` spans on contract calls, log queries and submissions
//!
//! # Example
//!
//! ```no_run
//! # async fn run(store: impl reqnet::store::ContentStore) -> Result<(), reqnet::RequestNetworkError> {
//! use reqnet::config::ClientConfig;
//! use reqnet_evm::{RequestNetwork, SignerConfig};
//!
//! let config = ClientConfig::from_env()?;
//! let signer = SignerConfig::from_env(&[])?;
//! let network = RequestNetwork::connect(&config, store, signer)?;
//! let request = network
//!     .get_request_by_id("0x8cdaf0cd259887258bc13a92c0a6da92698644c0000000000000000000000001".parse()?, None)
//!     .await?;
//! # let _ = request;
//! # Ok(())
//! # }
//! ```

/// Awaits a future, optionally instrumenting it with a tracing span.
macro_rules! traced {
    ($fut:expr, $span:expr) => {{
        #[cfg(feature = "telemetry")]
        {
            use tracing::Instrument;
            $fut.instrument($span).await
        }
        #[cfg(not(feature = "telemetry"))]
        {
            $fut.await
        }
    }};
}

pub mod chain;
pub mod contract;
pub mod logs;
pub mod policy;
pub mod provider;
pub mod reader;
pub mod service;
pub mod signer;

pub use chain::{ChainAccess, ChainAccessError};
pub use logs::{LogDecoder, PaddingPolicy};
pub use policy::CurrencyPolicy;
pub use provider::AlloyChain;
pub use reader::RequestReader;
pub use service::RequestNetwork;
pub use signer::{RequestSigner, SignerConfig, SignerError};
