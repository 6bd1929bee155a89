//! Content-addressed storage for request metadata.
//!
//! Request metadata is a JSON document kept off chain; the request only stores
//! its handle. [`ContentStore`] is the collaborator boundary. `reqnet-ipfs`
//! provides the IPFS implementation and [`MemoryStore`] serves tests and local
//! tooling.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use alloy_primitives::keccak256;

/// A content-addressed JSON store.
pub trait ContentStore: Send + Sync {
    /// Error raised when the store cannot be reached or has no such content.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Stores a JSON document and returns its handle.
    fn put(
        &self,
        document: &serde_json::Value,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    /// Fetches the JSON document stored under `handle`.
    fn get(&self, handle: &str) -> impl Future<Output = Result<serde_json::Value, Self::Error>> + Send;
}

/// Errors raised by [`MemoryStore`].
#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    /// No document is stored under the handle.
    #[error("no content stored under {0}")]
    NotFound(String),
    /// The document could not be serialized.
    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// An in-process [`ContentStore`].
///
/// Handles are the hex `keccak256` of the compact JSON serialization, so the
/// same document always gets the same handle.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<HashMap<String, serde_json::Value>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a document under a caller-chosen handle.
    pub fn insert(&self, handle: impl Into<String>, document: serde_json::Value) {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(handle.into(), document);
    }

    /// Number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContentStore for MemoryStore {
    type Error = MemoryStoreError;

    async fn put(&self, document: &serde_json::Value) -> Result<String, Self::Error> {
        let bytes = serde_json::to_vec(document)?;
        let handle = keccak256(bytes).to_string();
        self.insert(handle.clone(), document.clone());
        Ok(handle)
    }

    async fn get(&self, handle: &str) -> Result<serde_json::Value, Self::Error> {
        self.documents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(handle)
            .cloned()
            .ok_or_else(|| MemoryStoreError::NotFound(handle.to_owned()))
    }
}
