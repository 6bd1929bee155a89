#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the Request Network invoicing protocol.
//!
//! A Request is a payment intent that lives partly on-chain (payees, expected
//! amounts, balances) and partly in content-addressed storage (free-form
//! metadata). This crate is chain-agnostic: it holds the data model, the
//! canonical tight-packing encoder whose output must match what the contracts
//! hash, and the request hasher built on top of it. Contract access lives in
//! `reqnet-evm`, content storage in `reqnet-ipfs`.
//!
//! # Modules
//!
//! - [`artifacts`] - Contract metadata registry keyed by network and name or address
//! - [`config`] - Client configuration loaded from the environment or a file
//! - [`currency`] - Known currencies and how they map to currency contracts
//! - [`error`] - The error taxonomy shared by every crate in the workspace
//! - [`gateway`] - Payment gateway payloads for signed requests
//! - [`hash`] - Signing and verification hashes over a Request
//! - [`networks`] - Supported Ethereum networks
//! - [`packed`] - Canonical tight-packing encoder
//! - [`store`] - Content-addressed store abstraction
//! - [`timestamp`] - Unix timestamps used for expiration dates
//! - [`types`] - Payee, Payer, Payment and Request
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation

pub mod artifacts;
pub mod config;
pub mod currency;
pub mod error;
pub mod gateway;
pub mod hash;
pub mod networks;
pub mod packed;
pub mod store;
pub mod timestamp;
pub mod types;

pub use error::RequestNetworkError;
pub use types::{Payee, Payer, Payment, Request, RequestId, RequestState, Role};
