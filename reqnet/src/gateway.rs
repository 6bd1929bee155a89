//! Payment gateway payloads.
//!
//! A signed request is handed to the payer through the Request payment gateway
//! as a base64-encoded JSON document appended to the gateway URL. Rendering
//! that URL as a QR code is left to the caller.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use crate::error::RequestNetworkError;
use crate::networks::EthereumNetwork;
use crate::types::Request;

/// Base URL of the payment gateway.
pub const PAYMENT_GATEWAY_BASE_URL: &str = "https://app.request.network/#/pay-with-request/";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GatewayPayload<'a> {
    signed_request: SignedRequestPayload,
    callback_url: &'a str,
    network_id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignedRequestPayload {
    currency_contract: String,
    data: String,
    expected_amounts: Vec<String>,
    expiration_date: Option<u64>,
    hash: String,
    payees_id_address: Vec<String>,
    payees_payment_address: Vec<Option<String>>,
    signature: String,
}

impl Request {
    /// Base64-encoded JSON payload the payment gateway expects for a signed request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestNetworkError::InvalidRequestParameters`] if the request
    /// has no hash or no signature.
    pub fn as_base64(
        &self,
        callback_url: &str,
        network: EthereumNetwork,
    ) -> Result<String, RequestNetworkError> {
        let hash = self
            .hash
            .ok_or_else(|| RequestNetworkError::invalid("cannot encode a request with no hash"))?;
        let signature = self.signature.as_ref().ok_or_else(|| {
            RequestNetworkError::invalid("cannot encode a request with no signature")
        })?;

        let payload = GatewayPayload {
            signed_request: SignedRequestPayload {
                currency_contract: self.currency_contract_address.to_checksum(None),
                data: self.data_handle.clone().unwrap_or_default(),
                expected_amounts: self.payees.iter().map(|p| p.amount.to_string()).collect(),
                expiration_date: self.expiration_date.map(|e| e.as_secs()),
                hash: hash.to_string(),
                payees_id_address: self
                    .payees
                    .iter()
                    .map(|p| p.id_address.to_checksum(None))
                    .collect(),
                payees_payment_address: self
                    .payees
                    .iter()
                    .map(|p| p.payment_address.map(|a| a.to_checksum(None)))
                    .collect(),
                signature: signature.to_string(),
            },
            callback_url,
            network_id: network.network_id(),
        };
        let json = serde_json::to_vec(&payload)
            .map_err(|e| RequestNetworkError::invalid(format!("cannot encode request: {e}")))?;
        Ok(STANDARD.encode(json))
    }

    /// Link that lets the payer pay this signed request through the gateway.
    ///
    /// # Errors
    ///
    /// Fails under the same conditions as [`Request::as_base64`].
    pub fn payment_gateway_url(
        &self,
        callback_url: &str,
        network: EthereumNetwork,
    ) -> Result<String, RequestNetworkError> {
        Ok(format!(
            "{PAYMENT_GATEWAY_BASE_URL}{}",
            self.as_base64(callback_url, network)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::UnixTimestamp;
    use crate::types::Payee;
    use alloy_primitives::{Address, B256, Bytes, I256, U256, address};

    fn signed_request() -> Request {
        let mut request = Request::new(
            address!("f25186b5081ff5ce73482ad761db0eb0d25abfbf"),
            vec![
                Payee::new(
                    address!("821aea9a577a9b44299b9c15c88cf3087f3b5544"),
                    None,
                    I256::from_raw(U256::from(100_000_000_000_000_000u64)),
                ),
                Payee::new(
                    Address::repeat_byte(2),
                    Some(Address::repeat_byte(3)),
                    I256::from_raw(U256::from(5u8)),
                ),
            ],
        );
        request.hash = Some(B256::repeat_byte(0xab));
        request.signature = Some(Bytes::from(vec![0x1b; 65]));
        request.expiration_date = Some(UnixTimestamp::from_secs(7_952_342_400_000));
        request.data_handle = Some("QmData".into());
        request
    }

    #[test]
    fn test_payload_shape() {
        let encoded = signed_request()
            .as_base64("https://example.com", EthereumNetwork::Rinkeby)
            .unwrap();
        let decoded: serde_json::Value =
            serde_json::from_slice(&STANDARD.decode(encoded).unwrap()).unwrap();

        assert_eq!(decoded["callbackUrl"], "https://example.com");
        assert_eq!(decoded["networkId"], 4);
        let signed = &decoded["signedRequest"];
        assert_eq!(
            signed["currencyContract"],
            "0xf25186B5081Ff5cE73482AD761DB0eB0d25abfBF"
        );
        assert_eq!(signed["data"], "QmData");
        assert_eq!(
            signed["expectedAmounts"],
            serde_json::json!(["100000000000000000", "5"])
        );
        assert_eq!(signed["expirationDate"], 7_952_342_400_000u64);
        assert_eq!(signed["payeesPaymentAddress"][0], serde_json::Value::Null);
        assert!(signed["payeesPaymentAddress"][1].is_string());
        assert_eq!(
            signed["payeesIdAddress"][0],
            "0x821aEa9a577a9b44299B9c15c88cf3087F3b5544"
        );
    }

    #[test]
    fn test_payload_starts_with_signed_request() {
        let encoded = signed_request()
            .as_base64("https://example.com", EthereumNetwork::Rinkeby)
            .unwrap();
        assert!(encoded.starts_with("eyJzaWduZWRSZXF1ZXN0Ijp7"));
    }

    #[test]
    fn test_unsigned_request_cannot_be_encoded() {
        let mut request = signed_request();
        request.signature = None;
        let err = request
            .as_base64("https://example.com", EthereumNetwork::Main)
            .unwrap_err();
        assert!(err.to_string().contains("signature"));
    }

    #[test]
    fn test_gateway_url_prefix() {
        let url = signed_request()
            .payment_gateway_url("https://example.com", EthereumNetwork::Main)
            .unwrap();
        assert!(url.starts_with(PAYMENT_GATEWAY_BASE_URL));
    }
}
