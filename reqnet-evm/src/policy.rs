//! Currency dispatch and request validation.
//!
//! A [`CurrencyPolicy`] says which currency contract serves a currency and how
//! that contract is called. Ether requests go through the shared
//! `RequestEthereum` contract; token requests go through the `RequestERC20`
//! contract deployed for the token, whose entry points carry an `Action`
//! suffix. Adding a currency means adding a variant here.

use alloy_primitives::{Address, B256, Bytes, I256, U256};
use alloy_sol_types::SolCall;
use reqnet::artifacts::{ArtifactRegistry, ContractFamily};
use reqnet::currency::{Currency, CurrencyKind};
use reqnet::timestamp::UnixTimestamp;
use reqnet::{Payee, RequestNetworkError};

use crate::contract::{IRequestERC20, IRequestEthereum};

/// Which currency contract serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyPolicy {
    /// Ether, through the shared `RequestEthereum` contract.
    Native,
    /// An ERC-20 token, through its `RequestERC20` contract.
    Token {
        /// Address of the token.
        token: Address,
    },
}

/// The calling convention of a currency contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractKind {
    /// `RequestEthereum`.
    Ethereum,
    /// `RequestERC20`.
    Erc20,
}

impl CurrencyPolicy {
    /// Selects the policy for a currency.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::UnsupportedCurrency`] for currencies that
    /// have no currency contract.
    pub fn for_currency(currency: &Currency) -> Result<Self, RequestNetworkError> {
        match currency.kind {
            CurrencyKind::Native => Ok(Self::Native),
            CurrencyKind::Erc20 { token } => Ok(Self::Token { token }),
            CurrencyKind::Bitcoin => Err(RequestNetworkError::UnsupportedCurrency(currency.name.to_owned())),
        }
    }

    /// Calling convention of the currency contract.
    #[must_use]
    pub const fn contract_kind(&self) -> ContractKind {
        match self {
            Self::Native => ContractKind::Ethereum,
            Self::Token { .. } => ContractKind::Erc20,
        }
    }

    /// Artifact name of the currency contract.
    #[must_use]
    pub fn artifact_name(&self) -> String {
        match self {
            Self::Native => "last-RequestEthereum".to_owned(),
            Self::Token { token } => format!("last-requesterc20-{token:#x}"),
        }
    }

    /// Address of the currency contract.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::ArtifactNotFound`] if no contract is
    /// deployed for this currency on the registry's network.
    pub fn contract_address(&self, artifacts: &ArtifactRegistry) -> Result<Address, RequestNetworkError> {
        Ok(artifacts.get(&self.artifact_name())?.address)
    }

    /// Currency-specific checks.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::InvalidRequestParameters`] for a zero token address.
    pub fn validate(&self) -> Result<(), RequestNetworkError> {
        match self {
            Self::Token { token } if token.is_zero() => Err(RequestNetworkError::invalid(format!(
                "{token} is not a valid token address"
            ))),
            _ => Ok(()),
        }
    }
}

impl ContractKind {
    /// Calling convention of the currency contract at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::ArtifactNotFound`] for an unknown address,
    /// [`RequestNetworkError::UnsupportedCurrency`] for a bitcoin contract and
    /// [`RequestNetworkError::InvalidRequestParameters`] for a non-currency contract.
    pub fn for_contract(artifacts: &ArtifactRegistry, address: Address) -> Result<Self, RequestNetworkError> {
        match artifacts.contract_family(address)? {
            ContractFamily::Ethereum => Ok(Self::Ethereum),
            ContractFamily::Erc20 => Ok(Self::Erc20),
            ContractFamily::BitcoinNodesValidation => {
                Err(RequestNetworkError::UnsupportedCurrency("BTC".to_owned()))
            }
            ContractFamily::Core => Err(RequestNetworkError::invalid(format!(
                "{address} is not a currency contract"
            ))),
        }
    }

    /// Whether the contract forwards ether payments along with the call.
    #[must_use]
    pub const fn pays_in_ether(&self) -> bool {
        matches!(self, Self::Ethereum)
    }

    /// Encodes `createRequestAsPayee`.
    #[must_use]
    pub fn create_as_payee(&self, args: &CreateAsPayee) -> Bytes {
        match self {
            Self::Ethereum => IRequestEthereum::createRequestAsPayeeCall {
                _payeesIdAddress: args.id_addresses.clone(),
                _payeesPaymentAddress: args.payment_addresses.clone(),
                _expectedAmounts: args.amounts.clone(),
                _payer: args.payer,
                _payerRefundAddress: args.payer_refund_address,
                _data: args.data.clone(),
            }
            .abi_encode(),
            Self::Erc20 => IRequestERC20::createRequestAsPayeeActionCall {
                _payeesIdAddress: args.id_addresses.clone(),
                _payeesPaymentAddress: args.payment_addresses.clone(),
                _expectedAmounts: args.amounts.clone(),
                _payer: args.payer,
                _payerRefundAddress: args.payer_refund_address,
                _data: args.data.clone(),
            }
            .abi_encode(),
        }
        .into()
    }

    /// Encodes `createRequestAsPayer`.
    #[must_use]
    pub fn create_as_payer(&self, args: &CreateAsPayer) -> Bytes {
        match self {
            Self::Ethereum => IRequestEthereum::createRequestAsPayerCall {
                _payeesIdAddress: args.id_addresses.clone(),
                _expectedAmounts: args.amounts.clone(),
                _payerRefundAddress: args.payer_refund_address,
                _payeeAmounts: args.payments.clone(),
                _additionals: args.additionals.clone(),
                _data: args.data.clone(),
            }
            .abi_encode(),
            Self::Erc20 => IRequestERC20::createRequestAsPayerActionCall {
                _payeesIdAddress: args.id_addresses.clone(),
                _expectedAmounts: args.amounts.clone(),
                _payerRefundAddress: args.payer_refund_address,
                _payeeAmounts: args.payments.clone(),
                _additionals: args.additionals.clone(),
                _data: args.data.clone(),
            }
            .abi_encode(),
        }
        .into()
    }

    /// Encodes `broadcastSignedRequestAsPayer`.
    #[must_use]
    pub fn broadcast_signed(&self, args: &BroadcastSigned) -> Bytes {
        match self {
            Self::Ethereum => IRequestEthereum::broadcastSignedRequestAsPayerCall {
                _requestData: args.request_data.clone(),
                _payeesPaymentAddress: args.payment_addresses.clone(),
                _payeeAmounts: args.payments.clone(),
                _additionals: args.additionals.clone(),
                _expirationDate: U256::from(args.expiration.as_secs()),
                _signature: args.signature.clone(),
            }
            .abi_encode(),
            Self::Erc20 => IRequestERC20::broadcastSignedRequestAsPayerActionCall {
                _requestData: args.request_data.clone(),
                _payeesPaymentAddress: args.payment_addresses.clone(),
                _payeeAmounts: args.payments.clone(),
                _additionals: args.additionals.clone(),
                _expirationDate: U256::from(args.expiration.as_secs()),
                _signature: args.signature.clone(),
            }
            .abi_encode(),
        }
        .into()
    }

    /// Request ID carried by a call to one of the contract's per-request
    /// entry points (`paymentAction`, `accept`, ...), if `input` is one.
    #[must_use]
    pub fn request_id_argument(&self, input: &[u8]) -> Option<B256> {
        let selector: [u8; 4] = input.get(..4)?.try_into().ok()?;
        let selectors: &[[u8; 4]] = match self {
            Self::Ethereum => &[
                IRequestEthereum::paymentActionCall::SELECTOR,
                IRequestEthereum::refundActionCall::SELECTOR,
                IRequestEthereum::subtractActionCall::SELECTOR,
                IRequestEthereum::additionalActionCall::SELECTOR,
                IRequestEthereum::acceptCall::SELECTOR,
                IRequestEthereum::cancelCall::SELECTOR,
            ],
            Self::Erc20 => &[
                IRequestERC20::paymentActionCall::SELECTOR,
                IRequestERC20::refundActionCall::SELECTOR,
                IRequestERC20::subtractActionCall::SELECTOR,
                IRequestERC20::additionalActionCall::SELECTOR,
                IRequestERC20::acceptCall::SELECTOR,
                IRequestERC20::cancelCall::SELECTOR,
            ],
        };
        if !selectors.contains(&selector) {
            return None;
        }
        input.get(4..36).map(B256::from_slice)
    }
}

/// Arguments of `createRequestAsPayee`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAsPayee {
    /// Payee identities.
    pub id_addresses: Vec<Address>,
    /// Payee payout addresses, zero when absent.
    pub payment_addresses: Vec<Address>,
    /// Expected amounts.
    pub amounts: Vec<I256>,
    /// The payer.
    pub payer: Address,
    /// Where refunds go.
    pub payer_refund_address: Address,
    /// Off-chain data handle, empty when absent.
    pub data: String,
}

/// Arguments of `createRequestAsPayer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAsPayer {
    /// Payee identities.
    pub id_addresses: Vec<Address>,
    /// Expected amounts.
    pub amounts: Vec<I256>,
    /// Where refunds go.
    pub payer_refund_address: Address,
    /// Amount paid to each payee at creation.
    pub payments: Vec<U256>,
    /// Amount added to each payee's expected amount at creation.
    pub additionals: Vec<U256>,
    /// Off-chain data handle, empty when absent.
    pub data: String,
}

/// Arguments of `broadcastSignedRequestAsPayer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastSigned {
    /// Packed request body.
    pub request_data: Bytes,
    /// Payee payout addresses, zero when absent.
    pub payment_addresses: Vec<Address>,
    /// Amount paid to each payee at creation.
    pub payments: Vec<U256>,
    /// Amount added to each payee's expected amount at creation.
    pub additionals: Vec<U256>,
    /// Expiration date the payee signed.
    pub expiration: UnixTimestamp,
    /// The payee's signature.
    pub signature: Bytes,
}

/// Checks the payee list shared by every creation and signing path.
///
/// # Errors
///
/// Returns [`RequestNetworkError::InvalidRequestParameters`] naming the failed constraint.
pub fn validate_payees(payees: &[Payee]) -> Result<(), RequestNetworkError> {
    if payees.is_empty() {
        return Err(RequestNetworkError::invalid("at least one payee is required"));
    }
    if payees.len() > usize::from(u8::MAX) {
        return Err(RequestNetworkError::invalid(format!(
            "at most {} payees are supported, got {}",
            u8::MAX,
            payees.len()
        )));
    }
    if let Some(payee) = payees.iter().find(|p| p.amount.is_negative()) {
        return Err(RequestNetworkError::invalid(format!(
            "amounts must be positive integers, got {} for {}",
            payee.amount, payee.id_address
        )));
    }
    Ok(())
}

/// Checks that a signature expiration date is strictly in the future.
///
/// # Errors
///
/// Returns [`RequestNetworkError::InvalidRequestParameters`] otherwise.
pub fn validate_expiration(expiration: UnixTimestamp) -> Result<(), RequestNetworkError> {
    if expiration.is_future() {
        Ok(())
    } else {
        Err(RequestNetworkError::invalid(format!(
            "expiration date {expiration} must be in the future"
        )))
    }
}

/// Per-payee creation amounts, defaulting to zero.
///
/// # Errors
///
/// Returns [`RequestNetworkError::InvalidRequestParameters`] if `amounts` is
/// given with a length other than `payee_count`.
pub fn amounts_or_zero(
    name: &str,
    amounts: Option<Vec<U256>>,
    payee_count: usize,
) -> Result<Vec<U256>, RequestNetworkError> {
    match amounts {
        None => Ok(vec![U256::ZERO; payee_count]),
        Some(amounts) if amounts.len() == payee_count => Ok(amounts),
        Some(amounts) => Err(RequestNetworkError::invalid(format!(
            "{name} must have one entry per payee, got {} for {payee_count} payees",
            amounts.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use reqnet::artifacts::ContractArtifact;
    use reqnet::currency::{BTC, DAI, ETH};
    use reqnet::networks::EthereumNetwork;

    fn amount(v: i64) -> I256 {
        I256::try_from(v).unwrap()
    }

    #[test]
    fn test_policy_for_currency() {
        assert_eq!(CurrencyPolicy::for_currency(&ETH).unwrap(), CurrencyPolicy::Native);
        assert_eq!(
            CurrencyPolicy::for_currency(&DAI).unwrap().artifact_name(),
            "last-requesterc20-0x345ca3e014aaf5dca488057592ee47305d9b3e10"
        );
        assert!(matches!(
            CurrencyPolicy::for_currency(&BTC),
            Err(RequestNetworkError::UnsupportedCurrency(_))
        ));
    }

    #[test]
    fn test_zero_token_is_rejected() {
        assert!(CurrencyPolicy::Token { token: Address::ZERO }.validate().is_err());
    }

    #[test]
    fn test_contract_address_from_registry() {
        let mut artifacts = ArtifactRegistry::new(EthereumNetwork::Private);
        let contract = address!("f25186b5081ff5ce73482ad761db0eb0d25abfbf");
        artifacts.insert(
            "last-requesterc20-0x345ca3e014aaf5dca488057592ee47305d9b3e10",
            ContractArtifact {
                file: "RequestERC20-0x345ca3e014aaf5dca488057592ee47305d9b3e10.json".into(),
                abi: serde_json::Value::Null,
                version: "0.0.1".into(),
                address: contract,
                block_number: 0,
            },
        );
        let policy = CurrencyPolicy::for_currency(&DAI).unwrap();
        assert_eq!(policy.contract_address(&artifacts).unwrap(), contract);
        assert!(matches!(
            CurrencyPolicy::Native.contract_address(&artifacts),
            Err(RequestNetworkError::ArtifactNotFound { .. })
        ));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let payees = vec![
            Payee::new(Address::repeat_byte(1), None, amount(10)),
            Payee::new(Address::repeat_byte(2), None, amount(-1)),
        ];
        let err = validate_payees(&payees).unwrap_err();
        assert!(err.to_string().contains("positive"));
        assert!(validate_payees(&[]).is_err());
    }

    #[test]
    fn test_past_expiration_rejected() {
        let err = validate_expiration(UnixTimestamp::from_secs(946_684_800)).unwrap_err();
        assert!(matches!(err, RequestNetworkError::InvalidRequestParameters(_)));
        assert!(validate_expiration(UnixTimestamp::now()).is_err());
        assert!(validate_expiration(UnixTimestamp::now() + 60).is_ok());
    }

    #[test]
    fn test_amounts_or_zero() {
        assert_eq!(amounts_or_zero("payments", None, 2).unwrap(), vec![U256::ZERO; 2]);
        assert!(amounts_or_zero("payments", Some(vec![U256::from(1u8)]), 2).is_err());
    }

    #[test]
    fn test_request_id_argument() {
        let id = B256::repeat_byte(0x42);
        let accept = IRequestEthereum::acceptCall { _requestId: id }.abi_encode();
        assert_eq!(ContractKind::Ethereum.request_id_argument(&accept), Some(id));

        let refund = IRequestERC20::refundActionCall {
            _requestId: id,
            _amountToRefund: U256::from(1u8),
        }
        .abi_encode();
        assert_eq!(ContractKind::Erc20.request_id_argument(&refund), Some(id));

        let estimation = IRequestEthereum::collectEstimationCall {
            _expectedAmount: amount(5),
        }
        .abi_encode();
        assert_eq!(ContractKind::Ethereum.request_id_argument(&estimation), None);
        assert_eq!(ContractKind::Ethereum.request_id_argument(&[0x01]), None);
    }

    #[test]
    fn test_token_calls_use_action_names() {
        let args = CreateAsPayer {
            id_addresses: vec![Address::repeat_byte(1)],
            amounts: vec![amount(1)],
            payer_refund_address: Address::repeat_byte(2),
            payments: vec![U256::ZERO],
            additionals: vec![U256::ZERO],
            data: String::new(),
        };
        let input = ContractKind::Erc20.create_as_payer(&args);
        assert_eq!(&input[..4], IRequestERC20::createRequestAsPayerActionCall::SELECTOR);
        let input = ContractKind::Ethereum.create_as_payer(&args);
        assert_eq!(&input[..4], IRequestEthereum::createRequestAsPayerCall::SELECTOR);
    }
}
