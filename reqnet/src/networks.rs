//! Ethereum networks the Request contracts are deployed on.
//!
//! The network name keys the artifact registry and the network ID is what the
//! payment gateway expects.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RequestNetworkError;

/// A supported Ethereum network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EthereumNetwork {
    /// Ethereum mainnet.
    Main,
    /// The Rinkeby test network.
    Rinkeby,
    /// A local development chain.
    Private,
}

impl EthereumNetwork {
    /// All known networks.
    pub const ALL: [Self; 3] = [Self::Main, Self::Rinkeby, Self::Private];

    /// Network ID as used by the payment gateway.
    #[must_use]
    pub const fn network_id(&self) -> u64 {
        match self {
            Self::Main => 1,
            Self::Rinkeby => 4,
            Self::Private => 99,
        }
    }

    /// Name used to key contract artifacts.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Rinkeby => "rinkeby",
            Self::Private => "private",
        }
    }
}

impl Display for EthereumNetwork {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EthereumNetwork {
    type Err = RequestNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|n| n.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RequestNetworkError::Config(format!("unknown Ethereum network {s}")))
    }
}
