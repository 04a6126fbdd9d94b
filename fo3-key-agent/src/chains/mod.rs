//! Chain drivers
//!
//! Each supported chain is one variant of [`ChainDriver`]. The
//! [`ChainRegistry`] maps a [`Network`] tag to its driver; adding a chain
//! means adding a variant and registering it.

pub mod mina;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::account::GroupedCredential;
use crate::crypto::mnemonic::Seed;
use crate::error::{Error, Result};
use mina::MinaDriver;

/// Chain / network identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Network {
    Mina,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mina => "Mina",
        }
    }

    /// Lowercase tag used in DIDs, e.g. `did:mina:…`
    pub fn did_method(&self) -> &'static str {
        match self {
            Self::Mina => "mina",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Mina" => Ok(Self::Mina),
            other => Err(Error::unsupported_network(other)),
        }
    }
}

impl TryFrom<String> for Network {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Network> for String {
    fn from(network: Network) -> Self {
        network.as_str().to_string()
    }
}

/// Network variant within a chain; selects the signature domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    #[default]
    Testnet,
}

impl NetworkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(Error::unsupported_network(other)),
        }
    }
}

/// Coordinates for a derivation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivationArgs {
    pub network: Network,
    pub account_index: u32,
    pub address_index: u32,
    pub network_type: NetworkType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
}

impl DerivationArgs {
    pub fn new(network: Network, account_index: u32, address_index: u32, network_type: NetworkType) -> Self {
        Self {
            network,
            account_index,
            address_index,
            network_type,
            operation: None,
        }
    }
}

/// Network and operation for a signing call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainOperationArgs {
    pub network: Network,
    pub network_type: NetworkType,
    pub operation: String,
}

impl ChainOperationArgs {
    pub fn new(network: Network, network_type: NetworkType, operation: impl Into<String>) -> Self {
        Self {
            network,
            network_type,
            operation: operation.into(),
        }
    }
}

/// Encoded private key and its address
pub struct KeyMaterial {
    pub private_key: Zeroizing<String>,
    pub public_key: String,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// What a caller can ask a driver to sign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignablePayload {
    Transaction(mina::TransactionBody),
    Message(mina::MessageBody),
    Fields(mina::SignableFields),
    Nullifier(mina::NullifierRequest),
}

impl SignablePayload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transaction(_) => "transaction",
            Self::Message(_) => "message",
            Self::Fields(_) => "fields",
            Self::Nullifier(_) => "nullifier",
        }
    }
}

/// Signing output, one variant per payload kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignedResult {
    Transaction(mina::SignedTransaction),
    Message(mina::SignedMessage),
    Fields(mina::SignedFields),
    Nullifier(mina::Nullifier),
}

/// Closed set of chain drivers
#[derive(Debug, Clone)]
pub enum ChainDriver {
    Mina(MinaDriver),
}

impl ChainDriver {
    pub fn network(&self) -> Network {
        match self {
            Self::Mina(_) => Network::Mina,
        }
    }

    pub fn supported_operations(&self) -> &'static [&'static str] {
        match self {
            Self::Mina(_) => &mina::MinaOperation::ALL,
        }
    }

    /// `UnsupportedOperationError` unless the driver offers `operation`
    pub fn check_operation(&self, operation: &str) -> Result<()> {
        if self.supported_operations().contains(&operation) {
            Ok(())
        } else {
            Err(Error::UnsupportedOperation(operation.to_string()))
        }
    }

    pub fn derive_key_material(&self, args: &DerivationArgs, seed: &Seed) -> Result<KeyMaterial> {
        match self {
            Self::Mina(driver) => driver.derive_key_material(args, seed),
        }
    }

    /// Address for the given coordinates, without building a credential
    pub fn derive_address(&self, args: &DerivationArgs, seed: &Seed) -> Result<String> {
        match self {
            Self::Mina(driver) => {
                let private_key = driver.derive_private_key(seed, args.account_index, args.address_index)?;
                Ok(driver.derive_address(&private_key))
            }
        }
    }

    pub fn derive_credential(&self, args: &DerivationArgs, seed: &Seed) -> Result<GroupedCredential> {
        match self {
            Self::Mina(driver) => driver.derive_credential(args, seed),
        }
    }

    pub fn sign(
        &self,
        credential: &GroupedCredential,
        payload: &SignablePayload,
        args: &ChainOperationArgs,
        seed: &Seed,
    ) -> Result<SignedResult> {
        match self {
            Self::Mina(driver) => driver.sign(credential, payload, args, seed),
        }
    }

    pub fn verify(&self, result: &SignedResult, network_type: NetworkType) -> Result<bool> {
        match self {
            Self::Mina(driver) => driver.verify(result, network_type),
        }
    }
}

/// Driver table keyed by network
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    drivers: HashMap<Network, ChainDriver>,
}

impl ChainRegistry {
    /// A registry with no drivers
    pub fn empty() -> Self {
        Self {
            drivers: HashMap::new(),
        }
    }

    pub fn register(&mut self, driver: ChainDriver) {
        self.drivers.insert(driver.network(), driver);
    }

    /// `NetworkError` for networks without a driver
    pub fn driver(&self, network: Network) -> Result<&ChainDriver> {
        self.drivers
            .get(&network)
            .ok_or_else(|| Error::unsupported_network(network))
    }

    pub fn networks(&self) -> Vec<Network> {
        self.drivers.keys().copied().collect()
    }
}

impl Default for ChainRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(ChainDriver::Mina(MinaDriver::new()));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parse() {
        assert_eq!("Mina".parse::<Network>().unwrap(), Network::Mina);

        let err = "NotASupportedNetwork".parse::<Network>().unwrap_err();
        assert_eq!(err.to_string(), "NetworkError: Unsupported network: NotASupportedNetwork");
    }

    #[test]
    fn test_network_tag_is_case_sensitive() {
        let err = "mina".parse::<Network>().unwrap_err();
        assert_eq!(err.to_string(), "NetworkError: Unsupported network: mina");
        assert!(serde_json::from_str::<Network>("\"mina\"").is_err());

        let network: Network = serde_json::from_str("\"Mina\"").unwrap();
        assert_eq!(serde_json::to_string(&network).unwrap(), "\"Mina\"");
    }

    #[test]
    fn test_args_reject_unknown_network() {
        let err = serde_json::from_str::<ChainOperationArgs>(
            r#"{"network":"NotAMinaNetwork","networkType":"testnet","operation":"mina_signMessage"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unsupported network: NotAMinaNetwork"));

        let err = serde_json::from_str::<DerivationArgs>(
            r#"{"network":"NotAMinaNetwork","accountIndex":0,"addressIndex":0,"networkType":"testnet"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Unsupported network: NotAMinaNetwork"));

        let args: DerivationArgs =
            serde_json::from_str(r#"{"network":"Mina","accountIndex":1,"addressIndex":2,"networkType":"mainnet"}"#)
                .unwrap();
        assert_eq!(args, DerivationArgs::new(Network::Mina, 1, 2, NetworkType::Mainnet));
    }

    #[test]
    fn test_network_serde_rejects_unknown() {
        assert_eq!(serde_json::to_string(&Network::Mina).unwrap(), "\"Mina\"");
        assert!(serde_json::from_str::<Network>("\"Ethereum\"").is_err());
    }

    #[test]
    fn test_operation_check() {
        let registry = ChainRegistry::default();
        let driver = registry.driver(Network::Mina).unwrap();

        assert!(driver.check_operation("mina_signFields").is_ok());
        assert!(matches!(
            driver.check_operation("eth_sign"),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_empty_registry_is_network_error() {
        let registry = ChainRegistry::empty();
        assert!(matches!(registry.driver(Network::Mina), Err(Error::Network(_))));
    }

    #[test]
    fn test_payload_untagged_serde() {
        let payload: SignablePayload = serde_json::from_str(r#"{"message":"hello"}"#).unwrap();
        assert_eq!(payload.kind(), "message");

        let payload: SignablePayload = serde_json::from_str(r#"{"fields":["1","2"]}"#).unwrap();
        assert_eq!(payload.kind(), "fields");

        let payload: SignablePayload = serde_json::from_str(r#"{"message":["1","2"]}"#).unwrap();
        assert_eq!(payload.kind(), "nullifier");
    }
}
