//! Cryptographic primitives and operations
//!
//! Mnemonic handling, seed envelope encryption and BIP-32 key derivation
//! used by the key agent and the chain drivers.

pub mod mnemonic;
pub mod envelope;
pub mod keys;

pub use mnemonic::*;
pub use envelope::{EncryptedSeed, EnvelopeError};
pub use keys::*;
