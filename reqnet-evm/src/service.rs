//! The Request Network service.
//!
//! [`RequestNetwork`] ties together chain access, the content store, the signer
//! and the contract metadata. It creates requests, signs them as the payee,
//! broadcasts signed requests as the payer and reads requests back.
//!
//! Every write is a single fire-and-forget submission: the transaction hash is
//! returned as soon as the node accepts the transaction. Waiting for inclusion
//! is up to the caller.

use alloy_primitives::{Address, Bytes, I256, TxHash, U256};
use alloy_sol_types::SolEvent;
use reqnet::artifacts::ArtifactRegistry;
use reqnet::config::ClientConfig;
use reqnet::currency::Currency;
use reqnet::hash::{HashMode, hash_request, request_body};
use reqnet::store::ContentStore;
use reqnet::timestamp::UnixTimestamp;
use reqnet::{Payee, Payer, Request, RequestId, RequestNetworkError, Role};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::{ChainAccess, TransactionSubmission, call_function};
use crate::contract::{IRequestCore, IRequestEthereum};
use crate::logs::{LogDecoder, PaddingPolicy};
use crate::policy::{
    BroadcastSigned, ContractKind, CreateAsPayee, CreateAsPayer, CurrencyPolicy, amounts_or_zero,
    validate_expiration, validate_payees,
};
use crate::provider::AlloyChain;
use crate::reader::RequestReader;
use crate::signer::{RequestSigner, SignerConfig, signing_digest, verify_signed_request};

/// Entry point to the Request Network contracts.
#[derive(Debug)]
pub struct RequestNetwork<C, S, K> {
    chain: C,
    store: S,
    signer: K,
    artifacts: ArtifactRegistry,
    decoder: LogDecoder,
}

impl<S: ContentStore> RequestNetwork<AlloyChain, S, SignerConfig> {
    /// Connects to the node and loads the contract metadata named by `config`.
    ///
    /// Transactions are signed with the keys held by `signer`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::Config`] if the provider URL is invalid or
    /// the artifacts cannot be loaded.
    pub fn connect(config: &ClientConfig, store: S, signer: SignerConfig) -> Result<Self, RequestNetworkError> {
        let artifacts = ArtifactRegistry::load(&config.artifacts_dir, config.ethereum_network)?;
        let chain = AlloyChain::connect_http(config.provider_url()?, signer.wallet());
        Ok(Self::new(chain, store, signer, artifacts))
    }
}

impl<C, S, K> RequestNetwork<C, S, K>
where
    C: ChainAccess,
    S: ContentStore,
    K: RequestSigner,
{
    /// Creates a service. Creation logs are decoded with short-padding repair.
    pub fn new(chain: C, store: S, signer: K, artifacts: ArtifactRegistry) -> Self {
        Self {
            chain,
            store,
            signer,
            artifacts,
            decoder: LogDecoder::new(PaddingPolicy::RepairShortPadding),
        }
    }

    /// Replaces the log decoder.
    #[must_use]
    pub fn with_decoder(mut self, decoder: LogDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Chain access.
    pub const fn chain(&self) -> &C {
        &self.chain
    }

    /// Content store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Contract metadata.
    pub const fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    /// A reader sharing this service's collaborators.
    pub const fn reader(&self) -> RequestReader<'_, C, S> {
        RequestReader::new(&self.chain, &self.store, &self.artifacts, self.decoder)
    }

    /// Creates a request on chain.
    ///
    /// As the payee, the primary payee sends `createRequestAsPayee` and pays
    /// the collection fee. As the payer, the payer sends `createRequestAsPayer`
    /// and pays each payee's `payment_amount` (plus `additional_amount`) at
    /// creation; absent amounts count as zero. `data` is stored on the content
    /// store first and its handle recorded with the request.
    ///
    /// Returns the transaction hash without waiting for inclusion.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::InvalidRequestParameters`] for invalid
    /// payees, [`RequestNetworkError::UnsupportedCurrency`] for a currency with no
    /// contract, [`RequestNetworkError::ContentStoreFailed`] if `data` cannot be
    /// stored and [`RequestNetworkError::Chain`] if submission fails.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(role = %role, currency = %currency.symbol)))]
    pub async fn create_request(
        &self,
        role: Role,
        currency: &Currency,
        payees: &[Payee],
        payer: &Payer,
        data: Option<&serde_json::Value>,
    ) -> Result<TxHash, RequestNetworkError> {
        let policy = CurrencyPolicy::for_currency(currency)?;
        policy.validate()?;
        validate_payees(payees)?;
        let contract = policy.contract_address(&self.artifacts)?;
        let kind = policy.contract_kind();
        let handle = self.store_metadata(data).await?.unwrap_or_default();

        let id_addresses: Vec<Address> = payees.iter().map(|p| p.id_address).collect();
        let amounts: Vec<I256> = payees.iter().map(|p| p.amount).collect();
        let fees = self.collect_estimation(contract, total_expected(payees)?).await?;

        let submission = match role {
            Role::Payee => {
                let input = kind.create_as_payee(&CreateAsPayee {
                    id_addresses,
                    payment_addresses: payment_addresses(payees),
                    amounts,
                    payer: payer.id_address,
                    payer_refund_address: payer.refund_address(),
                    data: handle,
                });
                TransactionSubmission {
                    from: payees[0].id_address,
                    to: contract,
                    input,
                    value: fees,
                }
            }
            Role::Payer => {
                let payments: Vec<U256> = payees.iter().map(|p| p.payment_amount.unwrap_or_default()).collect();
                let additionals: Vec<U256> = payees.iter().map(|p| p.additional_amount.unwrap_or_default()).collect();
                let value = if kind.pays_in_ether() {
                    checked_total(&[fees, checked_total(&payments)?, checked_total(&additionals)?])?
                } else {
                    fees
                };
                let input = kind.create_as_payer(&CreateAsPayer {
                    id_addresses,
                    amounts,
                    payer_refund_address: payer.refund_address(),
                    payments,
                    additionals,
                    data: handle,
                });
                TransactionSubmission {
                    from: payer.id_address,
                    to: contract,
                    input,
                    value,
                }
            }
        };
        self.submit(submission).await
    }

    /// Signs a request without broadcasting it.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::RoleNotSupported`] for [`Role::Payer`];
    /// otherwise fails as [`RequestNetwork::sign_request_as_payee`] does.
    pub async fn create_signed_request(
        &self,
        role: Role,
        currency: &Currency,
        payees: &[Payee],
        expiration: UnixTimestamp,
        data: Option<&serde_json::Value>,
    ) -> Result<Request, RequestNetworkError> {
        match role {
            Role::Payee => self.sign_request_as_payee(currency, payees, expiration, data).await,
            Role::Payer => Err(RequestNetworkError::RoleNotSupported(
                "signing requests as the payer is not supported".to_owned(),
            )),
        }
    }

    /// Signs a request as its primary payee.
    ///
    /// The returned request has a hash and a signature but no ID and no payer.
    /// Anyone holding it can broadcast it as the payer until `expiration`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::InvalidRequestParameters`] for invalid
    /// payees or an expiration date not in the future,
    /// [`RequestNetworkError::SigningKeyNotFound`] if no key is bound to the
    /// primary payee and [`RequestNetworkError::ContentStoreFailed`] if `data`
    /// cannot be stored.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(currency = %currency.symbol, expiration = %expiration)))]
    pub async fn sign_request_as_payee(
        &self,
        currency: &Currency,
        payees: &[Payee],
        expiration: UnixTimestamp,
        data: Option<&serde_json::Value>,
    ) -> Result<Request, RequestNetworkError> {
        let policy = CurrencyPolicy::for_currency(currency)?;
        policy.validate()?;
        validate_payees(payees)?;
        validate_expiration(expiration)?;
        let contract = policy.contract_address(&self.artifacts)?;

        let mut request = Request::new(contract, payees.to_vec());
        request.data_handle = self.store_metadata(data).await?;
        request.data = data.cloned();
        request.expiration_date = Some(expiration);
        let hash = hash_request(&request, HashMode::Signing { expiration })?;
        let signature = self
            .signer
            .sign_digest(&signing_digest(&hash), payees[0].id_address)
            .await?;
        request.hash = Some(hash);
        request.signature = Some(Bytes::from(signature.as_bytes()));
        Ok(request)
    }

    /// Broadcasts a request signed by its payee, as `payer`.
    ///
    /// `creation_payments` are paid to each payee when the request is created
    /// and `additionals` raise each payee's expected amount; both default to
    /// zero. The currency contract is the one the request was signed for.
    ///
    /// Returns the transaction hash without waiting for inclusion.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::InvalidRequestParameters`] if the request
    /// is not validly signed by its primary payee or an amount list has the
    /// wrong length, [`RequestNetworkError::ArtifactNotFound`] if its currency
    /// contract is unknown and [`RequestNetworkError::Chain`] if submission fails.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(payer = %payer)))]
    pub async fn broadcast_signed_request(
        &self,
        signed: &Request,
        payer: Address,
        creation_payments: Option<Vec<U256>>,
        additionals: Option<Vec<U256>>,
    ) -> Result<TxHash, RequestNetworkError> {
        verify_signed_request(signed)?;
        let (Some(expiration), Some(signature)) = (signed.expiration_date, signed.signature.clone()) else {
            return Err(RequestNetworkError::invalid("request is not signed"));
        };
        let contract = signed.currency_contract_address;
        let kind = ContractKind::for_contract(&self.artifacts, contract)?;
        let payments = amounts_or_zero("creation payments", creation_payments, signed.payees.len())?;
        let additionals = amounts_or_zero("additionals", additionals, signed.payees.len())?;

        let fees = self.collect_estimation(contract, total_expected(&signed.payees)?).await?;
        let value = if kind.pays_in_ether() {
            checked_total(&[fees, checked_total(&payments)?])?
        } else {
            fees
        };
        let input = kind.broadcast_signed(&BroadcastSigned {
            request_data: request_body(signed)?,
            payment_addresses: payment_addresses(&signed.payees),
            payments,
            additionals,
            expiration,
            signature,
        });
        self.submit(TransactionSubmission {
            from: payer,
            to: contract,
            input,
            value,
        })
        .await
    }

    /// Reads a request back from chain.
    ///
    /// # Errors
    ///
    /// See [`RequestReader::reconstruct`].
    pub async fn get_request_by_id(
        &self,
        request_id: RequestId,
        start_block: Option<u64>,
    ) -> Result<Request, RequestNetworkError> {
        self.reader().reconstruct(request_id, start_block).await
    }

    /// Reads back the request a transaction created or acted on.
    ///
    /// Calls such as `accept` or `paymentAction` name the request in their
    /// first argument. For creation calls the ID is taken from the `Created`
    /// log in the receipt, and logs are searched from the transaction's block.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::TransactionNotFound`] if the transaction
    /// or its receipt does not exist, [`RequestNetworkError::MissingCreationEvent`]
    /// if a creation transaction emitted no `Created` log, and otherwise fails
    /// as [`RequestReader::reconstruct`] does.
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(tx = %hash)))]
    pub async fn get_request_by_transaction_hash(&self, hash: TxHash) -> Result<Request, RequestNetworkError> {
        let tx = traced!(
            self.chain.get_transaction(hash),
            tracing::info_span!("get_transaction", otel.kind = "client")
        )?
        .ok_or_else(|| RequestNetworkError::TransactionNotFound(hash.to_string()))?;
        let to = tx.to.ok_or_else(|| {
            RequestNetworkError::invalid(format!("transaction {hash} does not call a currency contract"))
        })?;
        let kind = ContractKind::for_contract(&self.artifacts, to)?;
        if let Some(request_id) = kind.request_id_argument(&tx.input) {
            return self.get_request_by_id(RequestId(request_id), None).await;
        }

        let receipt = traced!(
            self.chain.get_transaction_receipt(hash),
            tracing::info_span!("get_transaction_receipt", otel.kind = "client")
        )?
        .ok_or_else(|| RequestNetworkError::TransactionNotFound(hash.to_string()))?;
        let topic0 = IRequestCore::Created::SIGNATURE_HASH;
        let log = receipt
            .logs
            .iter()
            .find(|log| log.topics.first() == Some(&topic0))
            .ok_or_else(|| RequestNetworkError::MissingCreationEvent(hash.to_string()))?;
        let created = self.decoder.decode_created(log)?;
        let start_block = tx.block_number.or(receipt.block_number);
        self.get_request_by_id(RequestId(created.request_id), start_block).await
    }

    async fn store_metadata(&self, data: Option<&serde_json::Value>) -> Result<Option<String>, RequestNetworkError> {
        let Some(data) = data.filter(|d| !is_empty_document(d)) else {
            return Ok(None);
        };
        let handle = traced!(
            self.store.put(data),
            tracing::info_span!("store_metadata", otel.kind = "client")
        )
        .map_err(|e| RequestNetworkError::ContentStoreFailed(e.to_string()))?;
        Ok(Some(handle))
    }

    async fn collect_estimation(&self, contract: Address, expected: I256) -> Result<U256, RequestNetworkError> {
        let call = IRequestEthereum::collectEstimationCall {
            _expectedAmount: expected,
        };
        Ok(traced!(
            call_function(&self.chain, contract, &call),
            tracing::info_span!("collect_estimation", contract = %contract, otel.kind = "client")
        )?)
    }

    async fn submit(&self, tx: TransactionSubmission) -> Result<TxHash, RequestNetworkError> {
        Ok(traced!(
            self.chain.send_transaction(tx),
            tracing::info_span!("send_transaction", otel.kind = "client")
        )?)
    }
}

fn is_empty_document(data: &serde_json::Value) -> bool {
    match data {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn payment_addresses(payees: &[Payee]) -> Vec<Address> {
    payees.iter().map(|p| p.payment_address.unwrap_or_default()).collect()
}

fn total_expected(payees: &[Payee]) -> Result<I256, RequestNetworkError> {
    payees
        .iter()
        .try_fold(I256::ZERO, |acc, p| acc.checked_add(p.amount))
        .ok_or_else(|| RequestNetworkError::invalid("sum of expected amounts overflows int256"))
}

fn checked_total(amounts: &[U256]) -> Result<U256, RequestNetworkError> {
    amounts
        .iter()
        .try_fold(U256::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or_else(|| RequestNetworkError::invalid("sum of amounts overflows uint256"))
}

#[cfg(test)]
mod tests {
    use alloy_primitives::{B256, address, b256, bytes};
    use alloy_sol_types::{SolCall, SolValue};
    use reqnet::currency::{DAI, ETH};
    use reqnet::store::MemoryStore;
    use serde_json::json;

    use super::*;
    use crate::chain::testing::{FakeChain, event_log};
    use crate::chain::{ReceiptInfo, TransactionInfo};
    use crate::contract::IRequestERC20;
    use crate::reader::fixtures::*;

    const PAYEE_KEY: &str = "c88b703fb08cbea894b6aeff5a544fb92e78a18e19814cd85da83b71f772aa6c";
    const EXPIRATION: UnixTimestamp = UnixTimestamp::from_secs(7_952_342_400_000);

    type TestNetwork = RequestNetwork<FakeChain, MemoryStore, SignerConfig>;

    fn amount(v: u64) -> I256 {
        I256::from_raw(U256::from(v))
    }

    fn network() -> TestNetwork {
        let signer = SignerConfig::new().with_key(PAYEE_KEY).unwrap();
        RequestNetwork::new(FakeChain::default(), MemoryStore::new(), signer, artifacts())
    }

    fn payees() -> Vec<Payee> {
        vec![
            Payee::new(PAYEE_A, Some(PAYOUT_A), amount(100_000_000)),
            Payee::new(PAYEE_B, None, amount(20_000_000)),
            Payee::new(
                address!("2932b7a2355d6fecc4b5c0b6bd44cc31df247a2e"),
                Some(address!("5aeda56215b167893e80b4fe645ba6d5bab767de")),
                amount(3_000_000),
            ),
        ]
    }

    fn expect_fees(network: &TestNetwork, contract: Address, expected: u64, fees: u64) {
        network.chain().on_call(
            contract,
            &IRequestEthereum::collectEstimationCall {
                _expectedAmount: amount(expected),
            },
            U256::from(fees).abi_encode(),
        );
    }

    fn sent(network: &TestNetwork) -> Vec<TransactionSubmission> {
        network.chain().sent.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_create_as_payee_stores_data_and_pays_fees() {
        let network = network();
        expect_fees(&network, ETHEREUM_CONTRACT, 123_000_000, 500);
        let data = json!({"reason": "invoice 42"});

        let tx_hash = network
            .create_request(Role::Payee, &ETH, &payees(), &Payer::new(PAYER), Some(&data))
            .await
            .unwrap();

        let sent = sent(&network);
        assert_eq!(sent.len(), 1);
        assert_eq!(tx_hash, alloy_primitives::keccak256(&sent[0].input));
        assert_eq!(sent[0].from, PAYEE_A);
        assert_eq!(sent[0].to, ETHEREUM_CONTRACT);
        assert_eq!(sent[0].value, U256::from(500u64));

        let call = IRequestEthereum::createRequestAsPayeeCall::abi_decode(&sent[0].input).unwrap();
        assert_eq!(call._payer, PAYER);
        assert_eq!(call._payerRefundAddress, PAYER);
        assert_eq!(call._payeesPaymentAddress[1], Address::ZERO);
        assert_eq!(network.store().get(&call._data).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_create_as_payer_in_ether_sends_payments() {
        let network = network();
        expect_fees(&network, ETHEREUM_CONTRACT, 123_000_000, 500);
        let mut payees = payees();
        payees[0] = payees[0].clone().with_creation_payment(U256::from(1_000u64), U256::from(7u64));
        let payer = Payer {
            id_address: PAYER,
            refund_address: Some(Address::repeat_byte(9)),
        };

        network
            .create_request(Role::Payer, &ETH, &payees, &payer, None)
            .await
            .unwrap();

        let sent = sent(&network);
        assert_eq!(sent[0].from, PAYER);
        assert_eq!(sent[0].value, U256::from(1_507u64));
        let call = IRequestEthereum::createRequestAsPayerCall::abi_decode(&sent[0].input).unwrap();
        assert_eq!(call._payerRefundAddress, Address::repeat_byte(9));
        assert_eq!(call._payeeAmounts, vec![U256::from(1_000u64), U256::ZERO, U256::ZERO]);
        assert_eq!(call._additionals[0], U256::from(7u64));
        assert!(call._data.is_empty());
        assert!(network.store().is_empty());
    }

    #[tokio::test]
    async fn test_create_as_payer_in_token_pays_fees_only() {
        let network = network();
        expect_fees(&network, ERC20_CONTRACT, 123_000_000, 500);
        let mut payees = payees();
        payees[1] = payees[1].clone().with_creation_payment(U256::from(1_000u64), U256::ZERO);

        network
            .create_request(Role::Payer, &DAI, &payees, &Payer::new(PAYER), None)
            .await
            .unwrap();

        let sent = sent(&network);
        assert_eq!(sent[0].to, ERC20_CONTRACT);
        assert_eq!(sent[0].value, U256::from(500u64));
        assert_eq!(
            &sent[0].input[..4],
            IRequestERC20::createRequestAsPayerActionCall::SELECTOR
        );
    }

    #[tokio::test]
    async fn test_create_rejects_negative_amount() {
        let network = network();
        let payees = vec![Payee::new(PAYEE_A, None, I256::MINUS_ONE)];
        let err = network
            .create_request(Role::Payee, &ETH, &payees, &Payer::new(PAYER), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::InvalidRequestParameters(_)));
        assert!(sent(&network).is_empty());
    }

    #[tokio::test]
    async fn test_sign_request_matches_known_vector() {
        let network = network();
        let request = network
            .sign_request_as_payee(&ETH, &payees(), EXPIRATION, None)
            .await
            .unwrap();

        assert_eq!(
            request.hash,
            Some(b256!("0b19a8ca1fcf735bffaacc7a9e4e2b86f9a9e98e382fff27edbf721bf70d351d"))
        );
        assert_eq!(
            request.signature,
            Some(bytes!(
                "954fcc32f2fa56beff4933d11fdda7c5f5f94fa708eef8af803e2d196e6d24a75cca40c1bceeef2c3786157bb0fc76ca0b6b00c957e5a1dde5247e59b0750c761c"
            ))
        );
        assert_eq!(request.id, None);
        assert_eq!(request.payer, None);
        assert_eq!(request.currency_contract_address, ETHEREUM_CONTRACT);
        verify_signed_request(&request).unwrap();
    }

    #[tokio::test]
    async fn test_sign_request_rejects_past_expiration() {
        let network = network();
        let err = network
            .sign_request_as_payee(&ETH, &payees(), UnixTimestamp::from_secs(1_500_000_000), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::InvalidRequestParameters(_)));
    }

    #[tokio::test]
    async fn test_sign_request_needs_payee_key() {
        let network = RequestNetwork::new(FakeChain::default(), MemoryStore::new(), SignerConfig::new(), artifacts());
        let err = network
            .sign_request_as_payee(&ETH, &payees(), EXPIRATION, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::SigningKeyNotFound(_)));
    }

    #[tokio::test]
    async fn test_signing_as_payer_is_not_supported() {
        let err = network()
            .create_signed_request(Role::Payer, &ETH, &payees(), EXPIRATION, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::RoleNotSupported(_)));
    }

    #[tokio::test]
    async fn test_broadcast_signed_request() {
        let network = network();
        let data = json!({"reason": "rent"});
        let signed = network
            .create_signed_request(Role::Payee, &ETH, &payees(), EXPIRATION, Some(&data))
            .await
            .unwrap();
        expect_fees(&network, ETHEREUM_CONTRACT, 123_000_000, 300);

        network
            .broadcast_signed_request(&signed, PAYER, Some(vec![U256::from(10u8), U256::ZERO, U256::ZERO]), None)
            .await
            .unwrap();

        let sent = sent(&network);
        assert_eq!(sent[0].from, PAYER);
        assert_eq!(sent[0].value, U256::from(310u64));
        let call = IRequestEthereum::broadcastSignedRequestAsPayerCall::abi_decode(&sent[0].input).unwrap();
        assert_eq!(call._requestData, request_body(&signed).unwrap());
        assert_eq!(call._payeesPaymentAddress[1], Address::ZERO);
        assert_eq!(call._additionals, vec![U256::ZERO; 3]);
        assert_eq!(call._expirationDate, U256::from(7_952_342_400_000u64));
        assert_eq!(Some(call._signature), signed.signature);
    }

    #[tokio::test]
    async fn test_broadcast_rejects_amount_list_of_wrong_length() {
        let network = network();
        let signed = network
            .sign_request_as_payee(&ETH, &payees(), EXPIRATION, None)
            .await
            .unwrap();

        let err = network
            .broadcast_signed_request(&signed, PAYER, Some(vec![U256::from(10u8)]), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("creation payments"));
        let err = network
            .broadcast_signed_request(&signed, PAYER, None, Some(vec![U256::ZERO; 4]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("additionals"));
        assert!(sent(&network).is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_rejects_tampered_request() {
        let network = network();
        let mut signed = network
            .sign_request_as_payee(&ETH, &payees(), EXPIRATION, None)
            .await
            .unwrap();
        signed.payees[0].amount = amount(1);
        let err = network
            .broadcast_signed_request(&signed, PAYER, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::InvalidRequestParameters(_)));

        let unsigned = Request::new(ETHEREUM_CONTRACT, payees());
        assert!(network.broadcast_signed_request(&unsigned, PAYER, None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_get_request_by_id() {
        let network = network();
        seed_storage(network.chain(), PAYER);
        network.chain().push_event(CORE, &created(""), 10, CREATION_TX);

        let request = network.get_request_by_id(request_id(), None).await.unwrap();
        assert_eq!(request.id, Some(request_id()));
        assert_eq!(request.payees.len(), 2);
    }

    #[tokio::test]
    async fn test_get_request_by_action_transaction() {
        let network = network();
        seed_storage(network.chain(), PAYER);
        network.chain().push_event(CORE, &created(""), 10, CREATION_TX);
        let accept_tx = B256::repeat_byte(0x0a);
        network.chain().add_transaction(
            TransactionInfo {
                hash: accept_tx,
                to: Some(ETHEREUM_CONTRACT),
                input: IRequestEthereum::acceptCall {
                    _requestId: request_id().0,
                }
                .abi_encode()
                .into(),
                block_number: Some(20),
            },
            None,
        );

        let request = network.get_request_by_transaction_hash(accept_tx).await.unwrap();
        assert_eq!(request.id, Some(request_id()));
        assert_eq!(request.transaction_hash, Some(CREATION_TX));
    }

    #[tokio::test]
    async fn test_get_request_by_creation_transaction() {
        let network = network();
        seed_storage(network.chain(), PAYER);
        network.chain().push_event(CORE, &created(""), 10, CREATION_TX);
        let broadcast = IRequestEthereum::broadcastSignedRequestAsPayerCall {
            _requestData: Bytes::new(),
            _payeesPaymentAddress: vec![],
            _payeeAmounts: vec![],
            _additionals: vec![],
            _expirationDate: U256::ZERO,
            _signature: Bytes::new(),
        };
        let balance_log = event_log(CORE, &update(0, 5), 10, CREATION_TX);
        network.chain().add_transaction(
            TransactionInfo {
                hash: CREATION_TX,
                to: Some(ETHEREUM_CONTRACT),
                input: broadcast.abi_encode().into(),
                block_number: Some(10),
            },
            Some(ReceiptInfo {
                transaction_hash: CREATION_TX,
                block_number: Some(10),
                logs: vec![balance_log, event_log(CORE, &created(""), 10, CREATION_TX)],
            }),
        );

        let request = network.get_request_by_transaction_hash(CREATION_TX).await.unwrap();
        assert_eq!(request.id, Some(request_id()));
        let queries = network.chain().log_queries.lock().unwrap();
        assert!(queries.iter().all(|q| q.from_block == 10));
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let err = network()
            .get_request_by_transaction_hash(B256::repeat_byte(0xee))
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::TransactionNotFound(_)));
    }

    #[tokio::test]
    async fn test_creation_transaction_without_receipt() {
        let network = network();
        network.chain().add_transaction(
            TransactionInfo {
                hash: CREATION_TX,
                to: Some(ETHEREUM_CONTRACT),
                input: Bytes::new(),
                block_number: None,
            },
            None,
        );
        let err = network
            .get_request_by_transaction_hash(CREATION_TX)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::TransactionNotFound(_)));
    }

    #[test]
    fn test_connect_reports_missing_artifacts() {
        let config = ClientConfig {
            artifacts_dir: std::env::temp_dir().join("reqnet-no-such-artifacts"),
            ..ClientConfig::default()
        };
        let result = RequestNetwork::connect(&config, MemoryStore::new(), SignerConfig::new());
        assert!(matches!(result.err(), Some(RequestNetworkError::Config(_))));
    }
}
