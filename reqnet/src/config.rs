//! Client configuration.
//!
//! Loaded from the process environment (after reading a `.env` file if one is
//! present) or from a JSON file whose string values may reference environment
//! variables with `$VAR` or `${VAR}` syntax.
//!
//! # Environment Variables
//!
//! - `REQUEST_NETWORK_ETHEREUM_NETWORK` - `main`, `rinkeby` or `private` (default: `private`)
//! - `WEB3_PROVIDER_URI` - JSON-RPC endpoint (default: `http://localhost:8545`)
//! - `IPFS_NODE_HOST` - IPFS API host (default: `localhost`)
//! - `IPFS_NODE_PORT` - IPFS API port (default: `5001`)
//! - `REQUEST_NETWORK_ARTIFACTS_DIR` - directory holding `artifacts.json` (default: `artifacts`)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::RequestNetworkError;
use crate::networks::EthereumNetwork;

/// Top-level client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Network to talk to.
    #[serde(default = "default_network")]
    pub ethereum_network: EthereumNetwork,

    /// JSON-RPC endpoint.
    #[serde(default = "default_provider_uri")]
    pub web3_provider_uri: String,

    /// IPFS API host.
    #[serde(default = "default_ipfs_host")]
    pub ipfs_node_host: String,

    /// IPFS API port.
    #[serde(default = "default_ipfs_port")]
    pub ipfs_node_port: u16,

    /// Directory holding the contract artifacts.
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
}

const fn default_network() -> EthereumNetwork {
    EthereumNetwork::Private
}

fn default_provider_uri() -> String {
    "http://localhost:8545".to_owned()
}

fn default_ipfs_host() -> String {
    "localhost".to_owned()
}

const fn default_ipfs_port() -> u16 {
    5001
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ethereum_network: default_network(),
            web3_provider_uri: default_provider_uri(),
            ipfs_node_host: default_ipfs_host(),
            ipfs_node_port: default_ipfs_port(),
            artifacts_dir: default_artifacts_dir(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from the environment, reading `.env` first.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::Config`] if a variable is set to an
    /// unparseable value.
    pub fn from_env() -> Result<Self, RequestNetworkError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RequestNetworkError> {
        let mut config = Self::default();
        if let Some(network) = lookup("REQUEST_NETWORK_ETHEREUM_NETWORK") {
            config.ethereum_network = network.parse()?;
        }
        if let Some(uri) = lookup("WEB3_PROVIDER_URI") {
            config.web3_provider_uri = uri;
        }
        if let Some(host) = lookup("IPFS_NODE_HOST") {
            config.ipfs_node_host = host;
        }
        if let Some(port) = lookup("IPFS_NODE_PORT") {
            config.ipfs_node_port = port
                .parse()
                .map_err(|e| RequestNetworkError::Config(format!("IPFS_NODE_PORT {port}: {e}")))?;
        }
        if let Some(dir) = lookup("REQUEST_NETWORK_ARTIFACTS_DIR") {
            config.artifacts_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Loads configuration from a JSON file, expanding environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::Config`] if the file cannot be read or parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, RequestNetworkError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RequestNetworkError::Config(format!("{}: {e}", path.display())))?;
        let expanded = expand_env_vars(&content);
        serde_json::from_str(&expanded)
            .map_err(|e| RequestNetworkError::Config(format!("{}: {e}", path.display())))
    }

    /// JSON-RPC endpoint as a URL.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::Config`] if the configured URI is not a valid URL.
    pub fn provider_url(&self) -> Result<Url, RequestNetworkError> {
        Url::parse(&self.web3_provider_uri).map_err(|e| {
            RequestNetworkError::Config(format!("web3 provider {}: {e}", self.web3_provider_uri))
        })
    }

    /// Base URL of the IPFS HTTP API.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::Config`] if host and port do not form a valid URL.
    pub fn ipfs_api_url(&self) -> Result<Url, RequestNetworkError> {
        let raw = format!("http://{}:{}/", self.ipfs_node_host, self.ipfs_node_port);
        Url::parse(&raw).map_err(|e| RequestNetworkError::Config(format!("IPFS node {raw}: {e}")))
    }
}

/// Expands `$VAR` and `${VAR}` patterns from the environment.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match std::env::var(&name) {
            Ok(val) if !name.is_empty() => result.push_str(&val),
            _ => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
