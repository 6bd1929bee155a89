//! Contract metadata registry.
//!
//! Artifacts are read once per session from a directory holding an
//! `artifacts.json` index and one JSON file per contract:
//!
//! ```json
//! { "private": { "last-requestethereum": "RequestEthereum.json",
//!                "0xf25186b5081ff5ce73482ad761db0eb0d25abfbf": "RequestERC20-0x345c.json" } }
//! ```
//!
//! ```json
//! { "abi": [], "version": "0.0.1",
//!   "networks": { "private": { "address": "0xf251…", "blockNumber": 12 } } }
//! ```
//!
//! Keys are matched case-insensitively, so a checksummed address finds its
//! lower-cased entry.

use std::collections::HashMap;
use std::path::Path;

use alloy_primitives::Address;
use serde::Deserialize;

use crate::error::RequestNetworkError;
use crate::networks::EthereumNetwork;

/// Metadata of one deployed contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    /// File the artifact was read from, e.g. `RequestEthereum.json`.
    pub file: String,
    /// ABI as found in the artifact.
    pub abi: serde_json::Value,
    /// Artifact version.
    pub version: String,
    /// Deployed address.
    pub address: Address,
    /// Block the contract was deployed in; log queries start here.
    pub block_number: u64,
}

/// Which family of Request contract an artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractFamily {
    /// `RequestCore`.
    Core,
    /// `RequestEthereum`.
    Ethereum,
    /// `RequestERC20`.
    Erc20,
    /// `RequestBitcoinNodesValidation`.
    BitcoinNodesValidation,
}

impl ContractFamily {
    fn from_file(file: &str) -> Option<Self> {
        if file.contains("RequestERC20") {
            Some(Self::Erc20)
        } else if file.contains("RequestEthereum") {
            Some(Self::Ethereum)
        } else if file.contains("RequestBitcoinNodesValidation") {
            Some(Self::BitcoinNodesValidation)
        } else if file.contains("RequestCore") {
            Some(Self::Core)
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArtifactFile {
    abi: serde_json::Value,
    version: String,
    networks: HashMap<String, NetworkDeployment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NetworkDeployment {
    address: Address,
    block_number: u64,
}

/// Artifacts for one network, keyed by lower-cased name or address.
#[derive(Debug, Clone)]
pub struct ArtifactRegistry {
    network: EthereumNetwork,
    artifacts: HashMap<String, ContractArtifact>,
}

impl ArtifactRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(network: EthereumNetwork) -> Self {
        Self {
            network,
            artifacts: HashMap::new(),
        }
    }

    /// Loads the artifacts of `network` from a directory.
    ///
    /// Entries whose artifact file has no deployment on `network` are skipped;
    /// looking them up raises [`RequestNetworkError::ArtifactNotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::Config`] if the index or an artifact file
    /// cannot be read or parsed.
    #[cfg_attr(feature = "telemetry", tracing::instrument(skip_all, err, fields(network = %network)))]
    pub fn load(dir: impl AsRef<Path>, network: EthereumNetwork) -> Result<Self, RequestNetworkError> {
        let dir = dir.as_ref();
        let index: HashMap<String, HashMap<String, String>> =
            read_json(&dir.join("artifacts.json"))?;

        let mut registry = Self::new(network);
        let Some(entries) = index.get(network.name()) else {
            return Ok(registry);
        };

        let mut files: HashMap<&str, ArtifactFile> = HashMap::new();
        for (key, file) in entries {
            if !files.contains_key(file.as_str()) {
                files.insert(file, read_json(&dir.join(file))?);
            }
            let Some(parsed) = files.get(file.as_str()) else {
                continue;
            };
            let Some(deployment) = parsed.networks.get(network.name()) else {
                continue;
            };
            registry.insert(
                key,
                ContractArtifact {
                    file: file.clone(),
                    abi: parsed.abi.clone(),
                    version: parsed.version.clone(),
                    address: deployment.address,
                    block_number: deployment.block_number,
                },
            );
        }
        Ok(registry)
    }

    /// Registers an artifact under a name or address.
    pub fn insert(&mut self, key: &str, artifact: ContractArtifact) {
        self.artifacts.insert(key.to_lowercase(), artifact);
    }

    /// Network this registry serves.
    #[must_use]
    pub const fn network(&self) -> EthereumNetwork {
        self.network
    }

    /// Looks an artifact up by name (`last-RequestEthereum`) or address.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::ArtifactNotFound`] naming the network and key.
    pub fn get(&self, name: &str) -> Result<&ContractArtifact, RequestNetworkError> {
        self.artifacts
            .get(&name.to_lowercase())
            .ok_or_else(|| RequestNetworkError::ArtifactNotFound {
                network: self.network.to_string(),
                name: name.to_owned(),
            })
    }

    /// Looks an artifact up by deployed address.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::ArtifactNotFound`] naming the network and address.
    pub fn get_by_address(&self, address: Address) -> Result<&ContractArtifact, RequestNetworkError> {
        self.get(&format!("{address:#x}"))
    }

    /// Family of the contract deployed at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::ArtifactNotFound`] if the address is unknown
    /// or its artifact file names no known contract family.
    pub fn contract_family(&self, address: Address) -> Result<ContractFamily, RequestNetworkError> {
        let artifact = self.get_by_address(address)?;
        ContractFamily::from_file(&artifact.file).ok_or_else(|| RequestNetworkError::ArtifactNotFound {
            network: self.network.to_string(),
            name: artifact.file.clone(),
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, RequestNetworkError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RequestNetworkError::Config(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&content)
        .map_err(|e| RequestNetworkError::Config(format!("{}: {e}", path.display())))
}
