//! Mnemonic phrase generation and seed handling

use bip39::Mnemonic;
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Smallest seed accepted by HD derivation, in bytes (128 bits)
pub const MIN_SEED_BYTES: usize = 16;
/// Largest seed accepted by HD derivation, in bytes (512 bits)
pub const MAX_SEED_BYTES: usize = 64;

/// Supported mnemonic strengths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MnemonicStrength {
    /// 12 words (128 bits)
    Words12,
    /// 24 words (256 bits)
    Words24,
}

impl MnemonicStrength {
    /// Get entropy length in bytes
    fn entropy_bytes(&self) -> usize {
        match self {
            Self::Words12 => 16,
            Self::Words24 => 32,
        }
    }

    /// Pick a strength from a word count
    pub fn from_word_count(words: usize) -> Result<Self> {
        match words {
            12 => Ok(Self::Words12),
            24 => Ok(Self::Words24),
            other => Err(Error::Input(format!("unsupported mnemonic length: {} words", other))),
        }
    }
}

/// Raw seed bytes. Wiped from memory when dropped.
#[derive(Clone)]
pub struct Seed(Zeroizing<Vec<u8>>);

impl Seed {
    /// Wrap raw bytes. Length is checked at derivation time, not here.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fails with `InputError` naming the actual length when the seed is
    /// outside 128..=512 bits
    pub fn validate_length(&self) -> Result<()> {
        let len = self.0.len();
        if !(MIN_SEED_BYTES..=MAX_SEED_BYTES).contains(&len) {
            return Err(Error::Input(format!(
                "wrong seed length={}. Should be between 128 and 512 bits; 256 bits is advised",
                len * 8
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Seed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Seed([REDACTED; {}])", self.0.len())
    }
}

impl PartialEq for Seed {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Seed {}

/// Generate a new random mnemonic phrase with the specified strength
pub fn generate_mnemonic(strength: MnemonicStrength) -> Result<String> {
    let mut entropy = Zeroizing::new(vec![0u8; strength.entropy_bytes()]);
    OsRng.fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| Error::Input(format!("invalid mnemonic entropy: {}", e)))?;

    Ok(mnemonic.to_string())
}

/// Validate a mnemonic phrase (wordlist and checksum)
pub fn validate_mnemonic(phrase: &str) -> Result<bool> {
    match Mnemonic::parse_normalized(phrase) {
        Ok(_) => Ok(true),
        Err(e) => Err(Error::Input(format!("invalid mnemonic: {}", e))),
    }
}

/// Derive the seed from a mnemonic phrase and an optional second-factor passphrase
pub fn mnemonic_to_seed(phrase: &str, passphrase: Option<&str>) -> Result<Seed> {
    let mnemonic = Mnemonic::parse_normalized(phrase)
        .map_err(|e| Error::Input(format!("invalid mnemonic: {}", e)))?;

    let seed = Zeroizing::new(mnemonic.to_seed(passphrase.unwrap_or("")));
    Ok(Seed::new(seed.to_vec()))
}
