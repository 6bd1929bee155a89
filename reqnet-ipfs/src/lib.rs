#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! IPFS storage for Request Network request metadata.
//!
//! [`IpfsStore`] implements [`ContentStore`] over the HTTP API of an IPFS
//! node: documents are added with `POST /api/v0/add` and read back with
//! `POST /api/v0/cat`. The handle recorded on chain is the IPFS content hash.
//!
//! Requests are not retried. A timeout can be set with
//! [`IpfsStore::with_timeout`]; without one a `cat` for content the node
//! cannot find may block for as long as the node keeps searching.
//!
//! # Feature Flags
//!
//! - `telemetry` - `tracing` spans on every API call

use std::time::Duration;

use reqnet::RequestNetworkError;
use reqnet::config::ClientConfig;
use reqnet::store::ContentStore;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
#[cfg(feature = "telemetry")]
use tracing::instrument;
use url::Url;

/// Errors raised while talking to an IPFS node.
#[derive(Debug, thiserror::Error)]
pub enum IpfsError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// The node's response is not the expected JSON.
    #[error("Invalid JSON: {context}: {source}")]
    InvalidJson {
        /// Human-readable context.
        context: &'static str,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

impl From<IpfsError> for RequestNetworkError {
    fn from(value: IpfsError) -> Self {
        match value {
            IpfsError::UrlParse { .. } => Self::Config(value.to_string()),
            _ => Self::ContentStoreFailed(value.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddResponse {
    hash: String,
}

/// A [`ContentStore`] backed by an IPFS node's HTTP API.
#[derive(Clone, Debug)]
pub struct IpfsStore {
    api_url: Url,
    add_url: Url,
    cat_url: Url,
    client: Client,
    timeout: Option<Duration>,
}

impl IpfsStore {
    /// Creates a store for the node whose API is served at `api_url`
    /// (e.g. `http://localhost:5001/`).
    ///
    /// # Errors
    ///
    /// Returns [`IpfsError::UrlParse`] if the endpoint URLs cannot be built.
    pub fn try_new(mut api_url: Url) -> Result<Self, IpfsError> {
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }
        let add_url = api_url.join("api/v0/add").map_err(|source| IpfsError::UrlParse {
            context: "Failed to construct api/v0/add URL",
            source,
        })?;
        let cat_url = api_url.join("api/v0/cat").map_err(|source| IpfsError::UrlParse {
            context: "Failed to construct api/v0/cat URL",
            source,
        })?;
        Ok(Self {
            api_url,
            add_url,
            cat_url,
            client: Client::new(),
            timeout: None,
        })
    }

    /// Creates a store for the node named by `IPFS_NODE_HOST` and `IPFS_NODE_PORT`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::Config`] if the host and port do not form a URL.
    pub fn from_config(config: &ClientConfig) -> Result<Self, RequestNetworkError> {
        Ok(Self::try_new(config.ipfs_api_url()?)?)
    }

    /// Sets a timeout for every request.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses a pre-configured HTTP client.
    #[must_use]
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Base URL of the node's API.
    pub const fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Adds a JSON document and returns its content hash.
    ///
    /// # Errors
    ///
    /// Returns [`IpfsError`] if the node cannot be reached or rejects the document.
    #[cfg_attr(feature = "telemetry", instrument(name = "reqnet.ipfs.add", skip_all, err))]
    pub async fn add(&self, document: &serde_json::Value) -> Result<String, IpfsError> {
        const CONTEXT: &str = "POST /api/v0/add";
        let bytes = serde_json::to_vec(document).map_err(|source| IpfsError::InvalidJson {
            context: CONTEXT,
            source,
        })?;
        let form = Form::new().part("file", Part::bytes(bytes).file_name("request.json"));
        let request = self.client.post(self.add_url.clone()).multipart(form);
        let body = self.send(request, CONTEXT).await?;
        let response: AddResponse = serde_json::from_slice(&body).map_err(|source| IpfsError::InvalidJson {
            context: CONTEXT,
            source,
        })?;
        Ok(response.hash)
    }

    /// Reads back the JSON document stored under `hash`.
    ///
    /// # Errors
    ///
    /// Returns [`IpfsError`] if the node cannot be reached, does not have the
    /// content, or the content is not JSON.
    #[cfg_attr(feature = "telemetry", instrument(name = "reqnet.ipfs.cat", skip(self), err))]
    pub async fn cat(&self, hash: &str) -> Result<serde_json::Value, IpfsError> {
        const CONTEXT: &str = "POST /api/v0/cat";
        let mut url = self.cat_url.clone();
        url.query_pairs_mut().append_pair("arg", hash);
        let body = self.send(self.client.post(url), CONTEXT).await?;
        serde_json::from_slice(&body).map_err(|source| IpfsError::InvalidJson {
            context: CONTEXT,
            source,
        })
    }

    async fn send(&self, mut request: reqwest::RequestBuilder, context: &'static str) -> Result<Vec<u8>, IpfsError> {
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        let response = request
            .send()
            .await
            .map_err(|source| IpfsError::Http { context, source })?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response
                .text()
                .await
                .map_err(|source| IpfsError::Http { context, source })?;
            return Err(IpfsError::HttpStatus { context, status, body });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| IpfsError::Http { context, source })?;
        Ok(body.to_vec())
    }
}

impl ContentStore for IpfsStore {
    type Error = IpfsError;

    async fn put(&self, document: &serde_json::Value) -> Result<String, IpfsError> {
        self.add(document).await
    }

    async fn get(&self, handle: &str) -> Result<serde_json::Value, IpfsError> {
        self.cat(handle).await
    }
}
