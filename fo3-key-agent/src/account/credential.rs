//! Grouped credentials

use serde::{Deserialize, Serialize};

use crate::chains::Network;

/// JSON-LD context carried by every credential
pub const WALLET_CONTEXT: &str = "https://w3id.org/wallet/v1";

/// A derived address and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// `did:<chain>:<address>`
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub controller: String,
    pub name: String,
    pub description: String,
    pub chain: Network,
    pub account_index: u32,
    pub address_index: u32,
    pub address: String,
}

impl GroupedCredential {
    /// Create a credential for an address derived at the given coordinates
    pub fn new(chain: Network, account_index: u32, address_index: u32, address: String) -> Self {
        let id = format!("did:{}:{}", chain.did_method(), address);
        Self {
            context: vec![WALLET_CONTEXT.to_string()],
            controller: id.clone(),
            id,
            kind: format!("{}Address", chain),
            name: format!("{} Account", chain),
            description: format!("My {} account.", chain),
            chain,
            account_index,
            address_index,
            address,
        }
    }

    /// Get the address string
    pub fn as_str(&self) -> &str {
        &self.address
    }

    /// Method segment of the DID in `id`, e.g. `mina`
    pub fn did_method(&self) -> Option<&str> {
        let mut parts = self.id.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("did"), Some(method), Some(_)) => Some(method),
            _ => None,
        }
    }

    /// Whether this credential sits at the given coordinates
    pub fn matches(&self, chain: Network, account_index: u32, address_index: u32) -> bool {
        self.chain == chain && self.account_index == account_index && self.address_index == address_index
    }
}
