//! Key agent configuration

use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

use crate::chains::NetworkType;

/// Identity fields stamped on a new agent state, and the CLI's default
/// network type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAgentConfig {
    pub id: String,
    pub issuer: String,
    pub subject: String,
    pub issuance_date: String,
    pub network_type: NetworkType,
}

fn urn_uuid() -> String {
    format!("urn:uuid:{}", Uuid::new_v4())
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl Default for KeyAgentConfig {
    fn default() -> Self {
        let subject = urn_uuid();
        Self {
            id: urn_uuid(),
            issuer: subject.clone(),
            subject,
            issuance_date: now(),
            network_type: NetworkType::default(),
        }
    }
}

impl KeyAgentConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let id = std::env::var("KEY_AGENT_ID").unwrap_or(defaults.id);
        let subject = std::env::var("KEY_AGENT_SUBJECT").unwrap_or(defaults.subject);
        let issuer = std::env::var("KEY_AGENT_ISSUER").unwrap_or_else(|_| subject.clone());

        let network_type = std::env::var("KEY_AGENT_NETWORK_TYPE")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(defaults.network_type);

        Self {
            id,
            issuer,
            subject,
            issuance_date: defaults.issuance_date,
            network_type,
        }
    }

    pub fn with_network_type(mut self, network_type: NetworkType) -> Self {
        self.network_type = network_type;
        self
    }
}
