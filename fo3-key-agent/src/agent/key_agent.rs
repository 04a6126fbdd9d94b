//! In-memory key agent
//!
//! Holds only the encrypted seed and the derived credentials. Every call
//! that needs key material asks the passphrase provider, decrypts the seed
//! for the duration of that call, and lets it drop (and be wiped) on the
//! way out, whether the call succeeds, fails or is cancelled.

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::passphrase::{self, PassphraseProvider};
use super::state::{KeyAgentKind, KeyAgentState};
use crate::account::GroupedCredential;
use crate::chains::{ChainDriver, ChainOperationArgs, ChainRegistry, DerivationArgs, SignablePayload, SignedResult};
use crate::config::KeyAgentConfig;
use crate::crypto::envelope;
use crate::crypto::keys::root_private_key;
use crate::crypto::mnemonic::{mnemonic_to_seed, Seed};
use crate::error::{Error, Result};

const DECRYPT_CONTEXT: &str = "Failed to decrypt root private key";
const EXPORT_CONTEXT: &str = "Failed to export root private key";

/// Run CPU-bound crypto off the async executor
async fn blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}

/// Key agent backed by a passphrase-encrypted seed
pub struct KeyAgent {
    /// Persisted fields; `credential_subject.contents` lives in `credentials`
    state: KeyAgentState,
    credentials: RwLock<Vec<GroupedCredential>>,
    registry: ChainRegistry,
}

impl KeyAgent {
    /// Build an agent from mnemonic words and an optional second-factor
    /// passphrase. The seed is encrypted under the provider's passphrase.
    pub async fn from_mnemonic_words(
        words: &str,
        second_factor: Option<&str>,
        provider: &dyn PassphraseProvider,
        config: KeyAgentConfig,
    ) -> Result<Self> {
        let words = Zeroizing::new(words.to_string());
        let second_factor = second_factor.map(|s| Zeroizing::new(s.to_string()));

        let seed = blocking(move || mnemonic_to_seed(&words, second_factor.as_deref().map(|s| s.as_str()))).await?;
        Self::from_seed(seed, provider, config).await
    }

    /// Build an agent around raw seed bytes
    pub async fn from_seed(seed: Seed, provider: &dyn PassphraseProvider, config: KeyAgentConfig) -> Result<Self> {
        seed.validate_length()?;
        let passphrase = passphrase::request(provider).await?;

        let encrypted =
            blocking(move || envelope::encrypt(seed.as_bytes(), &passphrase).map_err(Error::Encryption)).await?;

        info!(id = %config.id, "created in-memory key agent");
        Ok(Self {
            state: KeyAgentState::new(encrypted, &config),
            credentials: RwLock::new(Vec::new()),
            registry: ChainRegistry::default(),
        })
    }

    /// Rebuild an agent from persisted state
    pub fn from_serializable_data(mut state: KeyAgentState) -> Result<Self> {
        if state.kind != KeyAgentKind::InMemory {
            return Err(Error::UnsupportedOperation(format!("{:?} key agent", state.kind)));
        }

        let credentials = std::mem::take(&mut state.credential_subject.contents);
        debug!(id = %state.id, credentials = credentials.len(), "restored key agent state");

        Ok(Self {
            state,
            credentials: RwLock::new(credentials),
            registry: ChainRegistry::default(),
        })
    }

    /// Replace the driver table
    pub fn with_registry(mut self, registry: ChainRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn kind(&self) -> KeyAgentKind {
        self.state.kind
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    async fn open_seed(&self, context: &'static str, provider: &dyn PassphraseProvider) -> Result<Seed> {
        let passphrase = passphrase::request(provider).await?;
        let encrypted = self.state.encrypted_seed_bytes.clone();

        let mut plaintext = blocking(move || {
            envelope::decrypt(&encrypted, &passphrase).map_err(|e| Error::authentication(context, e))
        })
        .await
        .map_err(|e| {
            warn!(id = %self.state.id, "{}", context);
            e
        })?;

        Ok(Seed::new(std::mem::take(&mut *plaintext)))
    }

    /// Decrypt and return the seed
    pub async fn decrypt_seed(&self, provider: &dyn PassphraseProvider) -> Result<Seed> {
        self.open_seed(DECRYPT_CONTEXT, provider).await
    }

    /// The BIP-32 master private key of the seed
    pub async fn export_root_private_key(&self, provider: &dyn PassphraseProvider) -> Result<Zeroizing<Vec<u8>>> {
        let seed = self.open_seed(EXPORT_CONTEXT, provider).await?;
        blocking(move || root_private_key(&seed)).await
    }

    /// Encoded chain private key at the given coordinates
    pub async fn derive_private_key(
        &self,
        args: &DerivationArgs,
        provider: &dyn PassphraseProvider,
    ) -> Result<Zeroizing<String>> {
        let driver = self.registry.driver(args.network)?.clone();
        let seed = self.open_seed(DECRYPT_CONTEXT, provider).await?;
        let args = args.clone();

        let material = blocking(move || driver.derive_key_material(&args, &seed)).await?;
        Ok(material.private_key)
    }

    /// Derive the credential at `args`. Unless `pure` is set it is also
    /// appended to the known credentials.
    pub async fn derive_credentials(
        &self,
        args: &DerivationArgs,
        provider: &dyn PassphraseProvider,
        pure: bool,
    ) -> Result<GroupedCredential> {
        let driver = self.registry.driver(args.network)?.clone();
        if let Some(operation) = &args.operation {
            driver.check_operation(operation)?;
        }

        let seed = self.open_seed(DECRYPT_CONTEXT, provider).await?;
        let task_args = args.clone();
        let credential = blocking(move || driver.derive_credential(&task_args, &seed)).await?;

        if !pure {
            let mut credentials = self.credentials.write().await;
            credentials.push(credential.clone());
            info!(
                network = %args.network,
                account_index = args.account_index,
                address_index = args.address_index,
                known = credentials.len(),
                "stored credential"
            );
        }

        Ok(credential)
    }

    /// Re-derive and store a credential after the agent has been restored
    pub async fn restore_key_agent(
        &self,
        args: &DerivationArgs,
        provider: &dyn PassphraseProvider,
    ) -> Result<GroupedCredential> {
        self.derive_credentials(args, provider, false).await
    }

    /// Sign `payload` with the key behind `credential`
    pub async fn sign(
        &self,
        credential: &GroupedCredential,
        payload: &SignablePayload,
        args: &ChainOperationArgs,
        provider: &dyn PassphraseProvider,
    ) -> Result<SignedResult> {
        let driver = self.driver_for(credential, args)?;
        driver.check_operation(&args.operation)?;

        let seed = self.open_seed(DECRYPT_CONTEXT, provider).await?;

        let credential = credential.clone();
        let payload = payload.clone();
        let task_args = args.clone();
        let signed = blocking(move || driver.sign(&credential, &payload, &task_args, &seed)).await?;

        debug!(operation = %args.operation, network = %args.network, "signed payload");
        Ok(signed)
    }

    /// Check a result produced by [`KeyAgent::sign`]. Needs no passphrase.
    pub fn verify(&self, result: &SignedResult, args: &ChainOperationArgs) -> Result<bool> {
        self.registry.driver(args.network)?.verify(result, args.network_type)
    }

    fn driver_for(&self, credential: &GroupedCredential, args: &ChainOperationArgs) -> Result<ChainDriver> {
        let driver = self.registry.driver(args.network)?;
        if credential.chain != args.network || credential.did_method() != Some(args.network.did_method()) {
            return Err(Error::Network(format!(
                "credential {} does not belong to network {}",
                credential.id, args.network
            )));
        }
        Ok(driver.clone())
    }

    /// Snapshot of the known credentials in derivation order
    pub async fn known_credentials(&self) -> Vec<GroupedCredential> {
        self.credentials.read().await.clone()
    }

    /// Full state for persistence
    pub async fn serializable_data(&self) -> KeyAgentState {
        let mut state = self.state.clone();
        state.credential_subject.contents = self.known_credentials().await;
        state
    }
}

impl std::fmt::Debug for KeyAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyAgent")
            .field("id", &self.state.id)
            .field("kind", &self.state.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::StaticPassphrase;
    use crate::chains::{Network, NetworkType};

    const MNEMONIC: &str = "habit hope tip crystal because grunt nation idea electric witness alert like";

    async fn agent() -> KeyAgent {
        KeyAgent::from_mnemonic_words(MNEMONIC, None, &StaticPassphrase::new("passphrase"), KeyAgentConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_decrypt_seed_matches_mnemonic() {
        let agent = agent().await;
        let seed = agent.decrypt_seed(&StaticPassphrase::new("passphrase")).await.unwrap();
        assert_eq!(seed, mnemonic_to_seed(MNEMONIC, None).unwrap());
    }

    #[tokio::test]
    async fn test_malformed_mnemonic_is_input_error() {
        let result = KeyAgent::from_mnemonic_words(
            "not a real mnemonic",
            None,
            &StaticPassphrase::new("passphrase"),
            KeyAgentConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(Error::Input(_))));
    }

    #[tokio::test]
    async fn test_failed_derivation_does_not_append() {
        let agent = agent().await;
        let args = DerivationArgs::new(Network::Mina, 0, 0, NetworkType::Testnet);

        let result = agent
            .derive_credentials(&args, &StaticPassphrase::new("wrong"), false)
            .await;
        assert!(matches!(result, Err(Error::Authentication { .. })));
        assert!(agent.known_credentials().await.is_empty());
    }

    #[tokio::test]
    async fn test_hardware_state_rejected() {
        let mut state = agent().await.serializable_data().await;
        state.kind = KeyAgentKind::Hardware;
        assert!(matches!(
            KeyAgent::from_serializable_data(state),
            Err(Error::UnsupportedOperation(_))
        ));
    }
}
