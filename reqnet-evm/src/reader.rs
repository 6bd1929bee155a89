//! Request reconstruction from chain state.
//!
//! [`RequestReader::reconstruct`] assembles a [`Request`] snapshot from the core
//! contract's storage, the currency contract's payout addresses, the
//! `Created` and `UpdateBalance` logs and the off-chain metadata. Contract
//! reads and the two log queries run concurrently. Nothing is cached and no
//! partial snapshot is ever returned.

use alloy_primitives::{Address, TxHash, U256};
use alloy_sol_types::SolEvent;
use futures_util::future::{try_join, try_join_all, try_join3};
use reqnet::artifacts::ArtifactRegistry;
use reqnet::store::ContentStore;
use reqnet::{Payee, Payment, Request, RequestId, RequestNetworkError, RequestState};
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::chain::{ChainAccess, LogFilter, RawLog, call_function};
use crate::contract::{IRequestCore, IRequestEthereum};
use crate::logs::{CreatedEvent, LogDecoder};

/// What the core and currency contracts store about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StoredRequest {
    payer: Address,
    currency_contract: Address,
    state: RequestState,
    payees: Vec<Payee>,
}

/// Reads requests back from the chain.
#[derive(Debug)]
pub struct RequestReader<'a, C, S> {
    chain: &'a C,
    store: &'a S,
    artifacts: &'a ArtifactRegistry,
    decoder: LogDecoder,
}

fn payout_address(address: Address) -> Option<Address> {
    (!address.is_zero()).then_some(address)
}

impl<'a, C, S> RequestReader<'a, C, S>
where
    C: ChainAccess,
    S: ContentStore,
{
    /// Creates a reader over a chain, a content store and contract metadata.
    pub const fn new(chain: &'a C, store: &'a S, artifacts: &'a ArtifactRegistry, decoder: LogDecoder) -> Self {
        Self {
            chain,
            store,
            artifacts,
            decoder,
        }
    }

    /// Rebuilds a request from chain state.
    ///
    /// Logs are searched from `start_block`, or from the core contract's
    /// deployment block when `None`.
    ///
    /// # Errors
    ///
    /// - [`RequestNetworkError::ArtifactNotFound`] if the ID's core contract is unknown
    /// - [`RequestNetworkError::RequestNotFound`] if the core contract reports no payer
    /// - [`RequestNetworkError::MissingCreationEvent`] / [`RequestNetworkError::AmbiguousCreationEvent`]
    ///   unless exactly one `Created` log matches
    /// - [`RequestNetworkError::MalformedLog`] if a log does not decode
    /// - [`RequestNetworkError::ContentFetchFailed`] if the metadata cannot be fetched
    /// - [`RequestNetworkError::Chain`] if a contract call or log query fails
    #[cfg_attr(feature = "telemetry", instrument(skip_all, err, fields(request_id = %request_id)))]
    pub async fn reconstruct(
        &self,
        request_id: RequestId,
        start_block: Option<u64>,
    ) -> Result<Request, RequestNetworkError> {
        let core = request_id.core_contract_address();
        let from_block = match start_block {
            Some(block) => block,
            None => self.artifacts.get_by_address(core)?.block_number,
        };
        let filter = |event_signature| LogFilter {
            address: core,
            event_signature,
            topic1: request_id.0,
            from_block,
            to_block: None,
        };
        let created_filter = filter(IRequestCore::Created::SIGNATURE_HASH);
        let update_filter = filter(IRequestCore::UpdateBalance::SIGNATURE_HASH);

        let (stored, created_logs, update_logs) = try_join3(
            self.read_stored(request_id, core),
            self.query_logs(&created_filter),
            self.query_logs(&update_filter),
        )
        .await?;

        let created = self.single_creation(request_id, &created_logs)?;
        let (data_handle, data) = self.fetch_metadata(&created.event.data).await?;

        let payments = update_logs
            .iter()
            .map(|log| {
                let event = self.decoder.decode_update_balance(log)?;
                Ok(Payment {
                    payee_index: event.payee_index,
                    delta_amount: event.delta_amount,
                })
            })
            .collect::<Result<Vec<_>, RequestNetworkError>>()?;

        let mut request = Request::new(stored.currency_contract, stored.payees);
        request.id = Some(request_id);
        request.creator = Some(created.event.creator);
        request.payer = Some(stored.payer);
        request.data_handle = data_handle;
        request.data = Some(data);
        request.transaction_hash = created.transaction_hash;
        request.state = Some(stored.state);
        request.payments = payments;
        for i in 0..request.payees.len() {
            request.payees[i].paid_amount = request.paid_amount(i)?;
        }
        Ok(request)
    }

    async fn query_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, RequestNetworkError> {
        Ok(traced!(
            self.chain.get_logs(filter),
            tracing::info_span!("get_logs", address = %filter.address, event = %filter.event_signature, otel.kind = "client")
        )?)
    }

    async fn read_stored(&self, request_id: RequestId, core: Address) -> Result<StoredRequest, RequestNetworkError> {
        let id = request_id.0;
        let stored = traced!(
            call_function(self.chain, core, &IRequestCore::getRequestCall { _requestId: id }),
            tracing::info_span!("get_request", core = %core, otel.kind = "client")
        )?;
        if stored.payer.is_zero() {
            return Err(RequestNetworkError::RequestNotFound {
                request_id: request_id.to_string(),
                core_contract: core.to_checksum(None),
            });
        }
        let state = RequestState::try_from(stored.state)?;
        let currency_contract = stored.currencyContract;

        let main_payee = async {
            let payment_address = self.payment_address(currency_contract, request_id, 0).await?;
            let mut payee = Payee::new(stored.payeeAddr, payment_address, stored.payeeExpectedAmount);
            payee.balance = Some(stored.payeeBalance);
            Ok::<_, RequestNetworkError>(payee)
        };
        let sub_payees = async {
            let count = call_function(self.chain, core, &IRequestCore::getSubPayeesCountCall { _requestId: id }).await?;
            try_join_all((0..count).map(|i| self.sub_payee(core, currency_contract, request_id, i))).await
        };
        let (main_payee, sub_payees) = try_join(main_payee, sub_payees).await?;

        let mut payees = Vec::with_capacity(sub_payees.len() + 1);
        payees.push(main_payee);
        payees.extend(sub_payees);
        Ok(StoredRequest {
            payer: stored.payer,
            currency_contract,
            state,
            payees,
        })
    }

    async fn sub_payee(
        &self,
        core: Address,
        currency_contract: Address,
        request_id: RequestId,
        index: u8,
    ) -> Result<Payee, RequestNetworkError> {
        let call = IRequestCore::subPayeesCall {
            _requestId: request_id.0,
            _index: U256::from(index),
        };
        let (sub_payee, payment_address) = try_join(
            async { Ok::<_, RequestNetworkError>(call_function(self.chain, core, &call).await?) },
            self.payment_address(currency_contract, request_id, index + 1),
        )
        .await?;
        let mut payee = Payee::new(sub_payee.addr, payment_address, sub_payee.expectedAmount);
        payee.balance = Some(sub_payee.balance);
        Ok(payee)
    }

    /// Both currency contracts share the `payeesPaymentAddress` signature.
    async fn payment_address(
        &self,
        currency_contract: Address,
        request_id: RequestId,
        payee_index: u8,
    ) -> Result<Option<Address>, RequestNetworkError> {
        let call = IRequestEthereum::payeesPaymentAddressCall {
            _requestId: request_id.0,
            _payeeIndex: payee_index,
        };
        let address = call_function(self.chain, currency_contract, &call).await?;
        Ok(payout_address(address))
    }

    fn single_creation(&self, request_id: RequestId, logs: &[RawLog]) -> Result<CreationLog, RequestNetworkError> {
        match logs {
            [] => Err(RequestNetworkError::MissingCreationEvent(request_id.to_string())),
            [log] => Ok(CreationLog {
                event: self.decoder.decode_created(log)?,
                transaction_hash: log.transaction_hash,
            }),
            _ => Err(RequestNetworkError::AmbiguousCreationEvent {
                request_id: request_id.to_string(),
                count: logs.len(),
            }),
        }
    }

    async fn fetch_metadata(
        &self,
        handle: &str,
    ) -> Result<(Option<String>, serde_json::Value), RequestNetworkError> {
        if handle.is_empty() {
            return Ok((None, serde_json::Value::Object(serde_json::Map::new())));
        }
        let data = traced!(
            self.store.get(handle),
            tracing::info_span!("fetch_metadata", handle = %handle, otel.kind = "client")
        )
        .map_err(|e| RequestNetworkError::ContentFetchFailed {
            handle: handle.to_owned(),
            reason: e.to_string(),
        })?;
        Ok((Some(handle.to_owned()), data))
    }
}

struct CreationLog {
    event: CreatedEvent,
    transaction_hash: Option<TxHash>,
}


#[cfg(test)]
mod tests {
    use alloy_primitives::{B256, Bytes, I256};
    use reqnet::store::MemoryStore;
    use serde_json::json;

    use super::fixtures::*;
    use super::*;
    use crate::chain::testing::{FakeChain, event_log};
    use crate::logs::PaddingPolicy;

    fn decoder() -> LogDecoder {
        LogDecoder::new(PaddingPolicy::RepairShortPadding)
    }

    fn seeded_chain(data: &str) -> FakeChain {
        let chain = FakeChain::default();
        seed_storage(&chain, PAYER);
        chain.push_event(CORE, &created(data), 10, CREATION_TX);
        chain
    }

    #[tokio::test]
    async fn test_reconstruct_full_request() {
        let chain = seeded_chain("QmHandle");
        chain.push_event(CORE, &update(0, 40), 11, B256::repeat_byte(2));
        chain.push_event(CORE, &update(1, 20_000_000), 12, B256::repeat_byte(3));
        chain.push_event(CORE, &update(0, 20), 12, B256::repeat_byte(4));
        let store = MemoryStore::new();
        store.insert("QmHandle", json!({"reason": "weekly groceries"}));
        let artifacts = artifacts();

        let reader = RequestReader::new(&chain, &store, &artifacts, decoder());
        let request = reader.reconstruct(request_id(), None).await.unwrap();

        assert_eq!(request.id, Some(request_id()));
        assert_eq!(request.payer, Some(PAYER));
        assert_eq!(request.creator, Some(PAYEE_A));
        assert_eq!(request.currency_contract_address, ETHEREUM_CONTRACT);
        assert_eq!(request.state, Some(RequestState::Accepted));
        assert_eq!(request.transaction_hash, Some(CREATION_TX));
        assert_eq!(request.data_handle.as_deref(), Some("QmHandle"));
        assert_eq!(request.data, Some(json!({"reason": "weekly groceries"})));

        assert_eq!(request.id_addresses(), vec![PAYEE_A, PAYEE_B]);
        assert_eq!(request.payment_addresses(), vec![Some(PAYOUT_A), None]);
        assert_eq!(request.payees[0].balance, Some(I256::try_from(60).unwrap()));

        let deltas: Vec<(u8, I256)> = request.payments.iter().map(|p| (p.payee_index, p.delta_amount)).collect();
        assert_eq!(
            deltas,
            vec![
                (0, I256::try_from(40).unwrap()),
                (1, I256::try_from(20_000_000).unwrap()),
                (0, I256::try_from(20).unwrap()),
            ]
        );
        assert_eq!(request.payees[0].paid_amount, I256::try_from(60).unwrap());
        assert_eq!(request.payees[1].paid_amount, I256::try_from(20_000_000).unwrap());
        assert!(!request.is_paid().unwrap());
    }

    #[tokio::test]
    async fn test_update_for_unknown_payee_index_is_kept_but_not_counted() {
        let chain = seeded_chain("");
        chain.push_event(CORE, &update(0, 40), 11, B256::repeat_byte(2));
        chain.push_event(CORE, &update(5, 99), 12, B256::repeat_byte(3));
        let store = MemoryStore::new();
        let artifacts = artifacts();

        let request = RequestReader::new(&chain, &store, &artifacts, decoder())
            .reconstruct(request_id(), None)
            .await
            .unwrap();
        assert_eq!(request.payments.len(), 2);
        assert_eq!(request.payments[1].payee_index, 5);
        assert_eq!(request.payees[0].paid_amount, I256::try_from(40).unwrap());
        assert_eq!(request.payees[1].paid_amount, I256::ZERO);
    }

    #[tokio::test]
    async fn test_overflowing_payments_fail_reconstruction() {
        let chain = seeded_chain("");
        let mut max = update(0, 0);
        max.deltaAmount = I256::MAX;
        chain.push_event(CORE, &max, 11, B256::repeat_byte(2));
        chain.push_event(CORE, &update(0, 1), 12, B256::repeat_byte(3));
        let artifacts = artifacts();

        let err = RequestReader::new(&chain, &MemoryStore::new(), &artifacts, decoder())
            .reconstruct(request_id(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::PaymentOverflow(0)));
    }

    #[tokio::test]
    async fn test_empty_handle_yields_empty_metadata() {
        let chain = seeded_chain("");
        let store = MemoryStore::new();
        let artifacts = artifacts();
        let request = RequestReader::new(&chain, &store, &artifacts, decoder())
            .reconstruct(request_id(), None)
            .await
            .unwrap();
        assert_eq!(request.data_handle, None);
        assert_eq!(request.data, Some(json!({})));
        assert!(request.payments.is_empty());
    }

    #[tokio::test]
    async fn test_zero_payer_is_not_found() {
        let chain = FakeChain::default();
        seed_storage(&chain, Address::ZERO);
        chain.push_event(CORE, &created(""), 10, CREATION_TX);
        let artifacts = artifacts();
        let err = RequestReader::new(&chain, &MemoryStore::new(), &artifacts, decoder())
            .reconstruct(request_id(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::RequestNotFound { .. }));
    }

    #[tokio::test]
    async fn test_creation_event_cardinality() {
        let artifacts = artifacts();
        let store = MemoryStore::new();

        let chain = FakeChain::default();
        seed_storage(&chain, PAYER);
        let err = RequestReader::new(&chain, &store, &artifacts, decoder())
            .reconstruct(request_id(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::MissingCreationEvent(_)));

        let chain = seeded_chain("");
        chain.push_event(CORE, &created(""), 11, B256::repeat_byte(9));
        let err = RequestReader::new(&chain, &store, &artifacts, decoder())
            .reconstruct(request_id(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::AmbiguousCreationEvent { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_start_block_narrows_log_range() {
        let chain = seeded_chain("");
        let artifacts = artifacts();
        let store = MemoryStore::new();
        let reader = RequestReader::new(&chain, &store, &artifacts, decoder());

        reader.reconstruct(request_id(), None).await.unwrap();
        let err = reader.reconstruct(request_id(), Some(11)).await.unwrap_err();
        assert!(matches!(err, RequestNetworkError::MissingCreationEvent(_)));

        let queries = chain.log_queries.lock().unwrap();
        assert!(queries[..2].iter().all(|q| q.from_block == DEPLOY_BLOCK));
        assert!(queries[2..].iter().all(|q| q.from_block == 11));
    }

    #[tokio::test]
    async fn test_short_padded_creation_log_is_repaired() {
        let chain = FakeChain::default();
        seed_storage(&chain, PAYER);
        let mut log = event_log(CORE, &created("QmShort"), 10, CREATION_TX);
        let trimmed = log.data.len() - 25;
        log.data = Bytes::copy_from_slice(&log.data[..trimmed]);
        chain.push_log(log);
        let store = MemoryStore::new();
        store.insert("QmShort", json!({"k": 1}));
        let artifacts = artifacts();

        let request = RequestReader::new(&chain, &store, &artifacts, decoder())
            .reconstruct(request_id(), None)
            .await
            .unwrap();
        assert_eq!(request.data_handle.as_deref(), Some("QmShort"));

        let strict = LogDecoder::new(PaddingPolicy::Strict);
        let err = RequestReader::new(&chain, &store, &artifacts, strict)
            .reconstruct(request_id(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::MalformedLog(_)));
    }

    #[tokio::test]
    async fn test_missing_metadata_fails_fetch() {
        let chain = seeded_chain("QmGone");
        let artifacts = artifacts();
        let err = RequestReader::new(&chain, &MemoryStore::new(), &artifacts, decoder())
            .reconstruct(request_id(), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RequestNetworkError::ContentFetchFailed { ref handle, .. } if handle == "QmGone"
        ));
    }

    #[tokio::test]
    async fn test_unknown_core_contract() {
        let chain = seeded_chain("");
        let artifacts = ArtifactRegistry::new(reqnet::networks::EthereumNetwork::Private);
        let err = RequestReader::new(&chain, &MemoryStore::new(), &artifacts, decoder())
            .reconstruct(request_id(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RequestNetworkError::ArtifactNotFound { .. }));
    }
}
