//! Passphrase providers
//!
//! The agent asks for the passphrase every time it needs the seed and
//! drops it as soon as the operation is done.

use std::future::Future;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Supplies the passphrase that unlocks the encrypted seed
#[async_trait]
pub trait PassphraseProvider: Send + Sync {
    async fn passphrase(&self) -> Result<Zeroizing<Vec<u8>>>;
}

#[async_trait]
impl<F, Fut> PassphraseProvider for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Zeroizing<Vec<u8>>>> + Send,
{
    async fn passphrase(&self) -> Result<Zeroizing<Vec<u8>>> {
        (self)().await
    }
}

/// A fixed passphrase held in memory
#[derive(Clone)]
pub struct StaticPassphrase(Zeroizing<Vec<u8>>);

impl StaticPassphrase {
    pub fn new(passphrase: impl AsRef<[u8]>) -> Self {
        Self(Zeroizing::new(passphrase.as_ref().to_vec()))
    }

    /// Read the passphrase from an environment variable
    pub fn from_env(var: &str) -> Result<Self> {
        let value = Zeroizing::new(
            std::env::var(var).map_err(|_| Error::Passphrase(format!("{} is not set", var)))?,
        );
        Ok(Self::new(value.as_bytes()))
    }
}

impl std::fmt::Debug for StaticPassphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StaticPassphrase(<redacted>)")
    }
}

#[async_trait]
impl PassphraseProvider for StaticPassphrase {
    async fn passphrase(&self) -> Result<Zeroizing<Vec<u8>>> {
        Ok(self.0.clone())
    }
}

/// Ask the provider and reject an empty answer
pub(crate) async fn request(provider: &dyn PassphraseProvider) -> Result<Zeroizing<Vec<u8>>> {
    let passphrase = provider.passphrase().await?;
    if passphrase.is_empty() {
        return Err(Error::Passphrase("passphrase is empty".to_string()));
    }
    Ok(passphrase)
}
