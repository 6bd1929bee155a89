//! Signing capability.
//!
//! A [`RequestSigner`] signs a digest on behalf of an identity address. The
//! only strategy provided is [`SignerConfig`], which holds one local private
//! key per identity. It is built once, up front, and handed to the service;
//! nothing reads key material from the environment at signing time.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::future::Future;

use alloy_network::EthereumWallet;
use alloy_primitives::{Address, B256, Signature, eip191_hash_message};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use reqnet::hash::{HashMode, hash_request};
use reqnet::{Request, RequestNetworkError};

/// Prefix of the per-identity private key environment variables.
pub const PRIVATE_KEY_ENV_PREFIX: &str = "REQUEST_NETWORK_PRIVATE_KEY_";

/// Errors raised by a signer.
#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// No key is bound to the identity.
    #[error("no signing key bound to {0}")]
    KeyNotFound(Address),
    /// A configured key could not be parsed.
    #[error("invalid private key for {identity}: {reason}")]
    InvalidKey {
        /// Identity (or variable) the key was configured for.
        identity: String,
        /// Parse failure.
        reason: String,
    },
    /// The underlying signer failed.
    #[error(transparent)]
    Signing(#[from] alloy_signer::Error),
}

impl From<SignerError> for RequestNetworkError {
    fn from(value: SignerError) -> Self {
        match value {
            SignerError::KeyNotFound(identity) => Self::SigningKeyNotFound(identity.to_checksum(None)),
            SignerError::InvalidKey { .. } => Self::Config(value.to_string()),
            SignerError::Signing(e) => Self::Signing(e.to_string()),
        }
    }
}

/// Signs digests on behalf of identities.
pub trait RequestSigner: Send + Sync {
    /// Signs `digest` with the key bound to `identity`.
    fn sign_digest(
        &self,
        digest: &B256,
        identity: Address,
    ) -> impl Future<Output = Result<Signature, SignerError>> + Send;
}

/// Private keys bound to identity addresses.
#[derive(Clone, Default)]
pub struct SignerConfig {
    keys: HashMap<Address, PrivateKeySigner>,
}

impl Debug for SignerConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerConfig")
            .field("identities", &self.identities())
            .finish()
    }
}

impl SignerConfig {
    /// Creates a configuration with no keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a key to the address it controls.
    #[must_use]
    pub fn with_signer(mut self, signer: PrivateKeySigner) -> Self {
        self.keys.insert(signer.address(), signer);
        self
    }

    /// Binds a hex-encoded private key to the address it controls.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidKey`] if `key` is not a valid private key.
    pub fn with_key(self, key: &str) -> Result<Self, SignerError> {
        let signer = key.trim().parse::<PrivateKeySigner>().map_err(|e| SignerError::InvalidKey {
            identity: "<inline key>".to_owned(),
            reason: e.to_string(),
        })?;
        Ok(self.with_signer(signer))
    }

    /// Resolves keys for `identities` from `REQUEST_NETWORK_PRIVATE_KEY_<checksummed address>`,
    /// reading `.env` first. Identities with no variable set are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidKey`] if a variable holds an invalid key or
    /// a key for a different address.
    pub fn from_env(identities: &[Address]) -> Result<Self, SignerError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(identities, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        identities: &[Address],
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SignerError> {
        let mut config = Self::new();
        for identity in identities {
            let var = format!("{PRIVATE_KEY_ENV_PREFIX}{}", identity.to_checksum(None));
            let Some(key) = lookup(&var) else {
                continue;
            };
            let signer = key.trim().parse::<PrivateKeySigner>().map_err(|e| SignerError::InvalidKey {
                identity: var.clone(),
                reason: e.to_string(),
            })?;
            if signer.address() != *identity {
                return Err(SignerError::InvalidKey {
                    identity: var,
                    reason: format!("key controls {}", signer.address()),
                });
            }
            config.keys.insert(*identity, signer);
        }
        Ok(config)
    }

    /// Identities with a bound key.
    #[must_use]
    pub fn identities(&self) -> Vec<Address> {
        let mut identities: Vec<Address> = self.keys.keys().copied().collect();
        identities.sort();
        identities
    }

    /// A wallet holding every bound key, for signing transactions.
    ///
    /// Returns `None` when no key is bound.
    #[must_use]
    pub fn wallet(&self) -> Option<EthereumWallet> {
        let mut signers = self.keys.values().cloned();
        let mut wallet = EthereumWallet::new(signers.next()?);
        for signer in signers {
            wallet.register_signer(signer);
        }
        Some(wallet)
    }
}

impl RequestSigner for SignerConfig {
    async fn sign_digest(&self, digest: &B256, identity: Address) -> Result<Signature, SignerError> {
        let signer = self.keys.get(&identity).ok_or(SignerError::KeyNotFound(identity))?;
        Ok(signer.sign_hash(digest).await?)
    }
}

/// Personal-message digest of a request hash, as signed by `eth_sign`.
#[must_use]
pub fn signing_digest(request_hash: &B256) -> B256 {
    eip191_hash_message(request_hash)
}

/// Checks that a signed request's hash is its signing hash and that the
/// signature was made by its primary payee.
///
/// # Errors
///
/// Returns [`RequestNetworkError::InvalidRequestParameters`] naming the failed
/// check, or [`RequestNetworkError::Encoding`] if the request cannot be hashed.
pub fn verify_signed_request(request: &Request) -> Result<(), RequestNetworkError> {
    let expiration = request
        .expiration_date
        .ok_or_else(|| RequestNetworkError::invalid("signed request has no expiration date"))?;
    let stored = request
        .hash
        .ok_or_else(|| RequestNetworkError::invalid("signed request has no hash"))?;
    let signature = request
        .signature
        .as_ref()
        .ok_or_else(|| RequestNetworkError::invalid("signed request has no signature"))?;
    let payee = request
        .main_payee()
        .ok_or_else(|| RequestNetworkError::invalid("signed request has no payees"))?;

    let computed = hash_request(request, HashMode::Signing { expiration })?;
    if computed != stored {
        return Err(RequestNetworkError::invalid(format!(
            "request hash {stored} does not match computed hash {computed}"
        )));
    }

    let signature = Signature::from_raw(signature)
        .map_err(|e| RequestNetworkError::invalid(format!("malformed signature {signature}: {e}")))?;
    let signer = signature
        .recover_address_from_prehash(&signing_digest(&stored))
        .map_err(|e| RequestNetworkError::invalid(format!("cannot recover signer: {e}")))?;
    if signer != payee.id_address {
        return Err(RequestNetworkError::invalid(format!(
            "request was signed by {signer}, not by payee {}",
            payee.id_address
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Bytes, I256, U256, address, b256, bytes};
    use reqnet::Payee;
    use reqnet::timestamp::UnixTimestamp;

    const PAYEE_KEY: &str = "c88b703fb08cbea894b6aeff5a544fb92e78a18e19814cd85da83b71f772aa6c";
    const PAYEE: Address = address!("821aea9a577a9b44299b9c15c88cf3087f3b5544");
    const REQUEST_HASH: B256 =
        b256!("0b19a8ca1fcf735bffaacc7a9e4e2b86f9a9e98e382fff27edbf721bf70d351d");

    fn known_request() -> Request {
        let amount = |v: u64| I256::from_raw(U256::from(v));
        let mut request = Request::new(
            address!("f25186b5081ff5ce73482ad761db0eb0d25abfbf"),
            vec![
                Payee::new(PAYEE, Some(address!("6330a553fc93768f612722bb8c2ec78ac90b3bbc")), amount(100_000_000)),
                Payee::new(address!("0d1d4e623d10f9fba5db95830f7d3839406c6af2"), None, amount(20_000_000)),
                Payee::new(
                    address!("2932b7a2355d6fecc4b5c0b6bd44cc31df247a2e"),
                    Some(address!("5aeda56215b167893e80b4fe645ba6d5bab767de")),
                    amount(3_000_000),
                ),
            ],
        );
        request.expiration_date = Some(UnixTimestamp::from_secs(7_952_342_400_000));
        request.hash = Some(REQUEST_HASH);
        request
    }

    #[tokio::test]
    async fn test_signature_matches_known_vector() {
        let config = SignerConfig::new().with_key(PAYEE_KEY).unwrap();
        let signature = config
            .sign_digest(&signing_digest(&REQUEST_HASH), PAYEE)
            .await
            .unwrap();
        assert_eq!(
            Bytes::from(signature.as_bytes()),
            bytes!(
                "954fcc32f2fa56beff4933d11fdda7c5f5f94fa708eef8af803e2d196e6d24a75cca40c1bceeef2c3786157bb0fc76ca0b6b00c957e5a1dde5247e59b0750c761c"
            )
        );
    }

    #[tokio::test]
    async fn test_unbound_identity() {
        let config = SignerConfig::new().with_key(PAYEE_KEY).unwrap();
        let err = config
            .sign_digest(&REQUEST_HASH, Address::repeat_byte(1))
            .await
            .unwrap_err();
        assert!(matches!(
            RequestNetworkError::from(err),
            RequestNetworkError::SigningKeyNotFound(_)
        ));
    }

    #[test]
    fn test_signer_failure_is_not_a_chain_error() {
        let err = SignerError::Signing(alloy_signer::Error::other("device disconnected"));
        let err = RequestNetworkError::from(err);
        assert!(matches!(&err, RequestNetworkError::Signing(reason) if reason.contains("device disconnected")));
    }

    #[test]
    fn test_from_lookup_uses_checksummed_variable() {
        let config = SignerConfig::from_lookup(&[PAYEE, Address::repeat_byte(7)], |var| {
            (var == "REQUEST_NETWORK_PRIVATE_KEY_0x821aEa9a577a9b44299B9c15c88cf3087F3b5544")
                .then(|| PAYEE_KEY.to_owned())
        })
        .unwrap();
        assert_eq!(config.identities(), vec![PAYEE]);
    }

    #[test]
    fn test_from_lookup_rejects_key_for_other_address() {
        let other = Address::repeat_byte(7);
        let err = SignerConfig::from_lookup(&[other], |_| Some(PAYEE_KEY.to_owned())).unwrap_err();
        assert!(matches!(err, SignerError::InvalidKey { .. }));
    }

    #[test]
    fn test_debug_does_not_print_keys() {
        let config = SignerConfig::new().with_key(PAYEE_KEY).unwrap();
        assert!(!format!("{config:?}").contains(PAYEE_KEY));
    }

    #[tokio::test]
    async fn test_verify_signed_request() {
        let config = SignerConfig::new().with_key(PAYEE_KEY).unwrap();
        let mut request = known_request();
        let signature = config
            .sign_digest(&signing_digest(&REQUEST_HASH), PAYEE)
            .await
            .unwrap();
        request.signature = Some(Bytes::from(signature.as_bytes()));
        verify_signed_request(&request).unwrap();

        request.payees.swap(0, 1);
        assert!(verify_signed_request(&request).is_err());
    }
}
