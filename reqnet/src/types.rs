//! Request Network data model.
//!
//! A [`Request`] is an immutable snapshot. It is either produced locally by
//! signing (hash and signature set, no identifier, payer or payments) or
//! assembled from chain reads (identifier, payer, creator and payments set, no
//! signature). Optional addresses stay `None` here; they become the zero
//! address only inside the canonical encoder.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use alloy_primitives::{Address, B256, I256, TxHash, U256};
use serde::{Deserialize, Serialize};

use crate::error::RequestNetworkError;
use crate::timestamp::UnixTimestamp;

/// Role of the party initiating a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// The party who owes the money.
    Payer,
    /// The party who is owed the money.
    Payee,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Payer => write!(f, "payer"),
            Self::Payee => write!(f, "payee"),
        }
    }
}

/// Lifecycle state of a request.
///
/// The core contract stores `Created`, `Accepted` and `Canceled` as 0, 1 and 2.
/// `Pending` never comes from the chain: it marks a request that was signed or
/// submitted but not yet observed on chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestState {
    /// Not yet observed on chain.
    Pending,
    /// Created but not yet accepted by the payer.
    Created,
    /// Accepted by the payer.
    Accepted,
    /// Canceled by either party.
    Canceled,
}

impl TryFrom<u8> for RequestState {
    type Error = RequestNetworkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Created),
            1 => Ok(Self::Accepted),
            2 => Ok(Self::Canceled),
            other => Err(RequestNetworkError::Chain(format!(
                "unknown request state {other}"
            ))),
        }
    }
}

/// A 32-byte request identifier.
///
/// The first 20 bytes are the address of the core contract that created the
/// request; the remaining 12 bytes are a counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub B256);

impl RequestId {
    /// Address of the core contract that created the request.
    #[must_use]
    pub fn core_contract_address(&self) -> Address {
        Address::from_slice(&self.0[..20])
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = RequestNetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<B256>()
            .map(Self)
            .map_err(|_| RequestNetworkError::invalid(format!("{s} is not a valid request ID")))
    }
}

impl From<B256> for RequestId {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

/// A recipient of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payee {
    /// Identity address of the payee.
    pub id_address: Address,
    /// Address payments are sent to, if different from the identity.
    pub payment_address: Option<Address>,
    /// Expected amount, in the smallest unit of the currency.
    pub amount: I256,
    /// Amount added on top of the expected amount by the payer at creation.
    #[serde(default)]
    pub additional_amount: Option<U256>,
    /// Amount paid by the payer at creation.
    #[serde(default)]
    pub payment_amount: Option<U256>,
    /// Balance reported by the core contract.
    #[serde(default)]
    pub balance: Option<I256>,
    /// Sum of balance updates observed in event logs.
    #[serde(default)]
    pub paid_amount: I256,
}

impl Payee {
    /// Creates a payee with an expected amount.
    #[must_use]
    pub const fn new(id_address: Address, payment_address: Option<Address>, amount: I256) -> Self {
        Self {
            id_address,
            payment_address,
            amount,
            additional_amount: None,
            payment_amount: None,
            balance: None,
            paid_amount: I256::ZERO,
        }
    }

    /// Sets the amounts paid by the payer when creating the request.
    #[must_use]
    pub const fn with_creation_payment(mut self, payment: U256, additional: U256) -> Self {
        self.payment_amount = Some(payment);
        self.additional_amount = Some(additional);
        self
    }
}

/// The party who pays a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payer {
    /// Identity address of the payer.
    pub id_address: Address,
    /// Refund address; defaults to the identity address.
    pub refund_address: Option<Address>,
}

impl Payer {
    /// Creates a payer with no separate refund address.
    #[must_use]
    pub const fn new(id_address: Address) -> Self {
        Self {
            id_address,
            refund_address: None,
        }
    }

    /// The address refunds go to.
    #[must_use]
    pub fn refund_address(&self) -> Address {
        self.refund_address.unwrap_or(self.id_address)
    }
}

/// A balance update against one payee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Index of the payee in the request's payee list.
    pub payee_index: u8,
    /// Signed change to the payee's balance.
    pub delta_amount: I256,
}

/// A Request snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Identifier, once the request exists on chain.
    pub id: Option<RequestId>,
    /// Address that created the request on chain.
    pub creator: Option<Address>,
    /// Currency contract handling payments for the request.
    pub currency_contract_address: Address,
    /// The payer, once known.
    pub payer: Option<Address>,
    /// Payees in index order. Index 0 is the primary payee.
    pub payees: Vec<Payee>,
    /// Content hash of the off-chain metadata.
    pub data_handle: Option<String>,
    /// Resolved off-chain metadata.
    pub data: Option<serde_json::Value>,
    /// Expiration date of a signed request.
    pub expiration_date: Option<UnixTimestamp>,
    /// Canonical hash of a signed request.
    pub hash: Option<B256>,
    /// Signature over the canonical hash.
    pub signature: Option<alloy_primitives::Bytes>,
    /// Transaction that created the request.
    pub transaction_hash: Option<TxHash>,
    /// On-chain state.
    pub state: Option<RequestState>,
    /// Balance updates in log emission order.
    pub payments: Vec<Payment>,
}

impl Request {
    /// Creates an empty snapshot for a currency contract and payees.
    #[must_use]
    pub const fn new(currency_contract_address: Address, payees: Vec<Payee>) -> Self {
        Self {
            id: None,
            creator: None,
            currency_contract_address,
            payer: None,
            payees,
            data_handle: None,
            data: None,
            expiration_date: None,
            hash: None,
            signature: None,
            transaction_hash: None,
            state: None,
            payments: Vec::new(),
        }
    }

    /// The primary payee.
    #[must_use]
    pub fn main_payee(&self) -> Option<&Payee> {
        self.payees.first()
    }

    /// Identity addresses of all payees, in index order.
    #[must_use]
    pub fn id_addresses(&self) -> Vec<Address> {
        self.payees.iter().map(|p| p.id_address).collect()
    }

    /// Payment addresses of all payees, in index order.
    #[must_use]
    pub fn payment_addresses(&self) -> Vec<Option<Address>> {
        self.payees.iter().map(|p| p.payment_address).collect()
    }

    /// Expected amounts of all payees, in index order.
    #[must_use]
    pub fn amounts(&self) -> Vec<I256> {
        self.payees.iter().map(|p| p.amount).collect()
    }

    /// Sum of payment deltas recorded against a payee index.
    ///
    /// Deltas recorded against an index with no payee are kept in
    /// [`payments`](Self::payments) but never counted here.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::PaymentOverflow`] if the sum does not fit in an `int256`.
    pub fn paid_amount(&self, payee_index: usize) -> Result<I256, RequestNetworkError> {
        self.payments
            .iter()
            .filter(|p| usize::from(p.payee_index) == payee_index)
            .try_fold(I256::ZERO, |acc, p| acc.checked_add(p.delta_amount))
            .ok_or(RequestNetworkError::PaymentOverflow(payee_index))
    }

    /// Whether every payee has received at least its expected amount.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::PaymentOverflow`] if a payee's payments overflow.
    pub fn is_paid(&self) -> Result<bool, RequestNetworkError> {
        for (i, payee) in self.payees.iter().enumerate() {
            if self.paid_amount(i)? < payee.amount {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
