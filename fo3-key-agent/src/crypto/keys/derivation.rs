//! BIP-32 (secp256k1) hierarchical key derivation

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use secp256k1::{PublicKey as Secp256k1PublicKey, Secp256k1, SecretKey};
use sha2::Sha512;
use zeroize::Zeroizing;

use crate::crypto::mnemonic::Seed;
use crate::error::{Error, Result};

/// Offset applied to hardened child indices
pub const HARDENED: u32 = 0x8000_0000;

/// A parsed derivation path such as `m/44'/12586'/0'/0/0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// `m/purpose'/coin_type'/account'/change/index`
    pub fn bip44(purpose: u32, coin_type: u32, account: u32, change: u32, index: u32) -> Result<Self> {
        Ok(Self(vec![
            harden(purpose)?,
            harden(coin_type)?,
            harden(account)?,
            normal(change)?,
            normal(index)?,
        ]))
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }
}

impl FromStr for DerivationPath {
    type Err = Error;

    fn from_str(path: &str) -> Result<Self> {
        if !path.starts_with("m/") {
            return Err(Error::KeyDerivation(format!("Invalid derivation path: {}", path)));
        }

        let mut result = Vec::new();
        for component in path.trim_start_matches("m/").split('/') {
            if component.is_empty() {
                continue;
            }

            let hardened = component.ends_with('\'');
            let index = component
                .trim_end_matches('\'')
                .parse::<u32>()
                .map_err(|_| Error::KeyDerivation(format!("Invalid derivation path component: {}", component)))?;

            result.push(if hardened { harden(index)? } else { normal(index)? });
        }

        Ok(Self(result))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for index in &self.0 {
            if *index >= HARDENED {
                write!(f, "/{}'", index - HARDENED)?;
            } else {
                write!(f, "/{}", index)?;
            }
        }
        Ok(())
    }
}

fn harden(index: u32) -> Result<u32> {
    if index >= HARDENED {
        return Err(Error::Input(format!("derivation index out of range: {}", index)));
    }
    Ok(index + HARDENED)
}

fn normal(index: u32) -> Result<u32> {
    if index >= HARDENED {
        return Err(Error::Input(format!("derivation index out of range: {}", index)));
    }
    Ok(index)
}

/// Private key plus chain code at one node of the tree
pub struct ExtendedPrivateKey {
    secret_key: Zeroizing<[u8; 32]>,
    chain_code: Zeroizing<[u8; 32]>,
}

impl ExtendedPrivateKey {
    /// Derive the master node from a seed
    pub fn master(seed: &Seed) -> Result<Self> {
        seed.validate_length()?;

        let mut hmac = Hmac::<Sha512>::new_from_slice(b"Bitcoin seed")
            .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;
        hmac.update(seed.as_bytes());
        let mut result = Zeroizing::new([0u8; 64]);
        result.copy_from_slice(&hmac.finalize().into_bytes());

        let node = Self::split(&result[..]);
        SecretKey::from_slice(&node.secret_key[..])
            .map_err(|e| Error::KeyDerivation(format!("Invalid master key: {}", e)))?;

        Ok(node)
    }

    /// Walk every component of `path` starting from the master node
    pub fn derive_path(seed: &Seed, path: &DerivationPath) -> Result<Self> {
        let mut node = Self::master(seed)?;
        for index in path.components() {
            node = node.derive_child(*index)?;
        }
        Ok(node)
    }

    /// Derive a child key from this node
    pub fn derive_child(&self, index: u32) -> Result<Self> {
        let secp = Secp256k1::new();
        let parent_secret_key = SecretKey::from_slice(&self.secret_key[..])
            .map_err(|e| Error::KeyDerivation(format!("Invalid parent key: {}", e)))?;

        let mut data = Zeroizing::new(Vec::with_capacity(37));
        if index >= HARDENED {
            data.push(0);
            data.extend_from_slice(&self.secret_key[..]);
        } else {
            let parent_public_key = Secp256k1PublicKey::from_secret_key(&secp, &parent_secret_key);
            data.extend_from_slice(&parent_public_key.serialize());
        }
        data.extend_from_slice(&index.to_be_bytes());

        let mut hmac = Hmac::<Sha512>::new_from_slice(&self.chain_code[..])
            .map_err(|_| Error::KeyDerivation("HMAC error".to_string()))?;
        hmac.update(&data);
        let mut result = Zeroizing::new([0u8; 64]);
        result.copy_from_slice(&hmac.finalize().into_bytes());

        let mut child = Self::split(&result[..]);

        // child = IL + parent (mod n)
        let tweak = SecretKey::from_slice(&child.secret_key[..])
            .map_err(|e| Error::KeyDerivation(format!("Invalid child key: {}", e)))?;
        let child_secret_key = tweak
            .add_tweak(&parent_secret_key.into())
            .map_err(|e| Error::KeyDerivation(format!("Key addition error: {}", e)))?;
        child.secret_key = Zeroizing::new(child_secret_key.secret_bytes());

        Ok(child)
    }

    /// The raw 32-byte private key, big-endian
    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret_key
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    fn split(output: &[u8]) -> Self {
        let mut secret_key = Zeroizing::new([0u8; 32]);
        let mut chain_code = Zeroizing::new([0u8; 32]);
        secret_key.copy_from_slice(&output[0..32]);
        chain_code.copy_from_slice(&output[32..64]);
        Self { secret_key, chain_code }
    }
}

/// The master private key for a seed, used for root key export
pub fn root_private_key(seed: &Seed) -> Result<Zeroizing<Vec<u8>>> {
    let master = ExtendedPrivateKey::master(seed)?;
    Ok(Zeroizing::new(master.secret_bytes().to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector_one_seed() -> Seed {
        Seed::new(hex::decode("000102030405060708090a0b0c0d0e0f").unwrap())
    }

    #[test]
    fn test_master_key_vector() {
        let master = ExtendedPrivateKey::master(&vector_one_seed()).unwrap();

        assert_eq!(
            hex::encode(master.secret_bytes()),
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
        );
        assert_eq!(
            hex::encode(master.chain_code()),
            "873dff81c02f525623fd1fe5167eac3a55a049de3d314bb42ee227ffed37d508"
        );
    }

    #[test]
    fn test_hardened_child_vector() {
        let path: DerivationPath = "m/0'".parse().unwrap();
        let child = ExtendedPrivateKey::derive_path(&vector_one_seed(), &path).unwrap();

        assert_eq!(
            hex::encode(child.secret_bytes()),
            "edb2e14f9ee77d26dd93b4ecede8d16ed408ce149b6cd80b0715a2d911a0afea"
        );
    }

    #[test]
    fn test_mixed_path_vector() {
        let path: DerivationPath = "m/0'/1".parse().unwrap();
        let child = ExtendedPrivateKey::derive_path(&vector_one_seed(), &path).unwrap();

        assert_eq!(
            hex::encode(child.secret_bytes()),
            "3c6cb8d0f6a264c91ea8b5030fadaa8e538b020f0a387421a12de9319dc93368"
        );
    }

    #[test]
    fn test_path_parse_and_display() {
        let path: DerivationPath = "m/44'/12586'/3'/0/7".parse().unwrap();
        assert_eq!(path.to_string(), "m/44'/12586'/3'/0/7");
        assert_eq!(path, DerivationPath::bip44(44, 12586, 3, 0, 7).unwrap());

        assert!("44'/0'".parse::<DerivationPath>().is_err());
        assert!("m/abc".parse::<DerivationPath>().is_err());
    }

    #[test]
    fn test_index_out_of_range() {
        assert!(matches!(DerivationPath::bip44(44, 12586, HARDENED, 0, 0), Err(Error::Input(_))));
    }

    #[test]
    fn test_short_seed_rejected() {
        let result = ExtendedPrivateKey::master(&Seed::new(vec![]));
        assert!(matches!(result, Err(Error::Input(_))));
    }
}
