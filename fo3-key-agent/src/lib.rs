//! FO3 Key Agent - key management core for multi-chain wallets
//!
//! This library turns a mnemonic into chain-specific keys and signatures
//! while keeping the seed encrypted at rest. It provides mnemonic and seed
//! handling, passphrase envelope encryption, BIP-32 derivation, a Mina
//! chain driver, and a key agent that ties them together.

pub mod error;
pub mod config;
pub mod crypto;
pub mod chains;
pub mod account;
pub mod agent;

// Re-export commonly used types for convenience
pub use error::{Error, Result};
pub use config::KeyAgentConfig;
pub use account::GroupedCredential;
pub use agent::{KeyAgent, KeyAgentKind, KeyAgentState, PassphraseProvider, StaticPassphrase};
pub use chains::{
    ChainDriver, ChainOperationArgs, ChainRegistry, DerivationArgs, Network, NetworkType, SignablePayload,
    SignedResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
