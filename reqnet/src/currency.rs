//! Known currencies.
//!
//! Each currency is served by a currency contract. Ether goes through the
//! shared `RequestEthereum` contract; an ERC-20 token goes through the
//! `RequestERC20` contract deployed for that token.

use alloy_primitives::{Address, address};
use serde::{Deserialize, Serialize};

use crate::error::RequestNetworkError;

/// How payments in a currency are settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CurrencyKind {
    /// Native ether.
    Native,
    /// An ERC-20 token.
    Erc20 {
        /// Address of the token contract.
        token: Address,
    },
    /// Bitcoin, paid off-chain and validated by nodes. Known but not supported.
    Bitcoin,
}

/// A currency a request can be denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Currency {
    /// Human-readable name.
    pub name: &'static str,
    /// Ticker symbol.
    pub symbol: &'static str,
    /// Decimal places of the smallest unit.
    pub decimals: u8,
    /// Settlement kind.
    pub kind: CurrencyKind,
}

/// Ether.
pub const ETH: Currency = Currency {
    name: "Ethereum",
    symbol: "ETH",
    decimals: 18,
    kind: CurrencyKind::Native,
};

/// Dai. The token address is the one deployed on the private test network.
pub const DAI: Currency = Currency {
    name: "Dai",
    symbol: "DAI",
    decimals: 18,
    kind: CurrencyKind::Erc20 {
        token: address!("345ca3e014aaf5dca488057592ee47305d9b3e10"),
    },
};

/// Bitcoin.
pub const BTC: Currency = Currency {
    name: "Bitcoin",
    symbol: "BTC",
    decimals: 8,
    kind: CurrencyKind::Bitcoin,
};

/// All known currencies.
pub const CURRENCIES: &[Currency] = &[ETH, DAI, BTC];

impl Currency {
    /// Creates an ERC-20 currency for an arbitrary token.
    #[must_use]
    pub const fn erc20(name: &'static str, symbol: &'static str, decimals: u8, token: Address) -> Self {
        Self {
            name,
            symbol,
            decimals,
            kind: CurrencyKind::Erc20 { token },
        }
    }

    /// Looks a currency up by ticker symbol.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::UnsupportedCurrency`] for an unknown symbol.
    pub fn by_symbol(symbol: &str) -> Result<Self, RequestNetworkError> {
        CURRENCIES
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
            .copied()
            .ok_or_else(|| RequestNetworkError::UnsupportedCurrency(symbol.to_owned()))
    }

    /// Looks a currency up by name.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::UnsupportedCurrency`] for an unknown name.
    pub fn by_name(name: &str) -> Result<Self, RequestNetworkError> {
        CURRENCIES
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| RequestNetworkError::UnsupportedCurrency(name.to_owned()))
    }
}
