//! Passphrase envelope encryption for seed bytes (EMIP-3 layout)
//!
//! `salt (32) ‖ nonce (12) ‖ tag (16) ‖ ciphertext`, where the key is
//! PBKDF2-HMAC-SHA512 over the passphrase and the cipher is
//! ChaCha20-Poly1305 with empty associated data.
//!
//! Functions here are stateless and safe to call concurrently.

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    ChaCha20Poly1305, Key, Nonce, Tag,
};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha512;
use thiserror::Error;
use zeroize::Zeroizing;

pub const SALT_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;
pub const PBKDF2_ROUNDS: u32 = 19_162;

const HEADER_LEN: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// Envelope failures. Messages never contain key material or plaintext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Failed to decrypt seed bytes: invalid tag")]
    InvalidTag,

    #[error("Failed to decrypt seed bytes: envelope too short ({0} bytes)")]
    Truncated(usize),

    #[error("Failed to encrypt seed bytes: {0}")]
    Encrypt(String),
}

/// Ciphertext plus integrity tag, as persisted in the agent state.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedSeed(Vec<u8>);

impl EncryptedSeed {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for EncryptedSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncryptedSeed({} bytes)", self.0.len())
    }
}

impl Serialize for EncryptedSeed {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for EncryptedSeed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// Stretch a passphrase into the symmetric key for one envelope
fn derive_key(passphrase: &[u8], salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha512>(passphrase, salt, PBKDF2_ROUNDS, &mut key[..]);
    key
}

/// Encrypt secret bytes under a passphrase with a fresh salt and nonce
pub fn encrypt(secret: &[u8], passphrase: &[u8]) -> Result<EncryptedSeed, EnvelopeError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));

    let mut buffer = Zeroizing::new(secret.to_vec());
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&nonce), b"", buffer.as_mut_slice())
        .map_err(|e| EnvelopeError::Encrypt(e.to_string()))?;

    let mut out = Vec::with_capacity(HEADER_LEN + buffer.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(tag.as_slice());
    out.extend_from_slice(&buffer);

    Ok(EncryptedSeed(out))
}

/// Decrypt an envelope. A wrong passphrase and a tampered blob both fail
/// with `InvalidTag`.
pub fn decrypt(envelope: &EncryptedSeed, passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    let bytes = envelope.as_bytes();
    if bytes.len() < HEADER_LEN {
        return Err(EnvelopeError::Truncated(bytes.len()));
    }

    let (salt, rest) = bytes.split_at(SALT_LEN);
    let (nonce, rest) = rest.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let key = derive_key(passphrase, salt);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(Nonce::from_slice(nonce), b"", buffer.as_mut_slice(), Tag::from_slice(tag))
        .map_err(|_| EnvelopeError::InvalidTag)?;

    Ok(buffer)
}
