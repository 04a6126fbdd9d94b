//! Persisted key agent state

use serde::{Deserialize, Serialize};

use crate::account::GroupedCredential;
use crate::config::KeyAgentConfig;
use crate::crypto::EncryptedSeed;

/// Verifiable credential types stamped on every persisted agent
pub const STATE_TYPES: [&str; 2] = ["VerifiableCredential", "EncryptedWallet"];

/// Which agent implementation owns the state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAgentKind {
    InMemory,
    Hardware,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSubject {
    pub id: String,
    pub contents: Vec<GroupedCredential>,
}

/// Everything needed to rebuild an agent. Holds no plaintext secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAgentState {
    pub kind: KeyAgentKind,
    pub encrypted_seed_bytes: EncryptedSeed,
    pub id: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub issuer: String,
    /// Kept as the stored string so it round-trips unchanged
    pub issuance_date: String,
    pub credential_subject: CredentialSubject,
}

impl KeyAgentState {
    /// Fresh in-memory state with no credentials
    pub fn new(encrypted_seed_bytes: EncryptedSeed, config: &KeyAgentConfig) -> Self {
        Self {
            kind: KeyAgentKind::InMemory,
            encrypted_seed_bytes,
            id: config.id.clone(),
            types: STATE_TYPES.iter().map(|t| t.to_string()).collect(),
            issuer: config.issuer.clone(),
            issuance_date: config.issuance_date.clone(),
            credential_subject: CredentialSubject {
                id: config.subject.clone(),
                contents: Vec::new(),
            },
        }
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
