//! Error types for the key agent

use thiserror::Error;

use crate::crypto::envelope::EnvelopeError;

/// Custom error type for key agent operations
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed mnemonic, bad seed length or a payload that does not fit
    /// the requested operation
    #[error("InputError: {0}")]
    Input(String),

    /// Wrong passphrase or a failed integrity check while opening the seed
    #[error("{context}: AuthenticationError: {source}")]
    Authentication {
        context: &'static str,
        #[source]
        source: EnvelopeError,
    },

    /// The seed could not be sealed under the passphrase
    #[error("EncryptionError: {0}")]
    Encryption(#[source] EnvelopeError),

    /// Unregistered network, or a network that does not match the credential
    #[error("NetworkError: {0}")]
    Network(String),

    /// Operation not offered by the chain driver
    #[error("UnsupportedOperationError: Unsupported private key operation: {0}")]
    UnsupportedOperation(String),

    #[error("Passphrase error: {0}")]
    Passphrase(String),

    #[error("Key derivation error: {0}")]
    KeyDerivation(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A blocking crypto worker panicked or was torn down
    #[error("Task error: {0}")]
    Task(String),
}

impl Error {
    /// `NetworkError` for a network string or tag no driver is registered for
    pub fn unsupported_network(network: impl std::fmt::Display) -> Self {
        Self::Network(format!("Unsupported network: {}", network))
    }

    /// Wrap an envelope failure with the operation that needed the seed
    pub fn authentication(context: &'static str, source: EnvelopeError) -> Self {
        Self::Authentication { context, source }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for key agent operations
pub type Result<T> = std::result::Result<T, Error>;
