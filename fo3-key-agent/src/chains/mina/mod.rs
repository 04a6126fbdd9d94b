//! Mina chain driver
//!
//! Keys come from the secp256k1 BIP-32 tree at
//! `m/44'/12586'/<account>'/0/<address>` and are then finished into Pallas
//! scalars. Signing covers transactions, messages, field vectors and
//! nullifiers.

pub mod keys;
pub mod nullifier;
pub mod signer;
pub mod types;

use std::str::FromStr;

use tracing::debug;
use zeroize::Zeroizing;

pub use keys::{reverse_bytes, MinaPrivateKey, MinaPublicKey};
pub use types::*;

use super::{ChainOperationArgs, DerivationArgs, KeyMaterial, Network, NetworkType, SignablePayload, SignedResult};
use crate::account::GroupedCredential;
use crate::crypto::keys::{DerivationPath, ExtendedPrivateKey};
use crate::crypto::mnemonic::Seed;
use crate::error::{Error, Result};

/// BIP-44 purpose
pub const PURPOSE: u32 = 44;
/// SLIP-44 coin type registered for Mina
pub const COIN_TYPE: u32 = 12586;

pub const SIGN_TRANSACTION: &str = "mina_signTransaction";
pub const SIGN_MESSAGE: &str = "mina_sign";
pub const SIGN_FIELDS: &str = "mina_signFields";
pub const CREATE_NULLIFIER: &str = "mina_createNullifier";

/// Decode a "B62…" address back into its public key
pub fn decode_address(address: &str) -> Result<MinaPublicKey> {
    MinaPublicKey::from_address(address)
}

/// Private key operations the Mina driver accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinaOperation {
    SignTransaction,
    SignMessage,
    SignFields,
    CreateNullifier,
}

impl MinaOperation {
    pub const ALL: [&'static str; 4] = [SIGN_TRANSACTION, SIGN_MESSAGE, SIGN_FIELDS, CREATE_NULLIFIER];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SignTransaction => SIGN_TRANSACTION,
            Self::SignMessage => SIGN_MESSAGE,
            Self::SignFields => SIGN_FIELDS,
            Self::CreateNullifier => CREATE_NULLIFIER,
        }
    }
}

impl FromStr for MinaOperation {
    type Err = Error;

    fn from_str(operation: &str) -> Result<Self> {
        match operation {
            SIGN_TRANSACTION => Ok(Self::SignTransaction),
            SIGN_MESSAGE => Ok(Self::SignMessage),
            SIGN_FIELDS => Ok(Self::SignFields),
            CREATE_NULLIFIER => Ok(Self::CreateNullifier),
            other => Err(Error::UnsupportedOperation(other.to_string())),
        }
    }
}

/// Stateless Mina driver
#[derive(Debug, Clone, Copy, Default)]
pub struct MinaDriver;

impl MinaDriver {
    pub fn new() -> Self {
        Self
    }

    /// `m/44'/12586'/<account>'/0/<address>`
    pub fn derivation_path(account_index: u32, address_index: u32) -> Result<DerivationPath> {
        DerivationPath::bip44(PURPOSE, COIN_TYPE, account_index, 0, address_index)
    }

    /// Walk the HD path and finish the child key into a Pallas scalar
    pub fn derive_private_key(&self, seed: &Seed, account_index: u32, address_index: u32) -> Result<MinaPrivateKey> {
        let path = Self::derivation_path(account_index, address_index)?;
        let node = ExtendedPrivateKey::derive_path(seed, &path)?;
        MinaPrivateKey::from_bip32(node.secret_bytes())
    }

    pub fn derive_key_material(&self, args: &DerivationArgs, seed: &Seed) -> Result<KeyMaterial> {
        let private_key = self.derive_private_key(seed, args.account_index, args.address_index)?;
        Ok(KeyMaterial {
            private_key: private_key.to_base58(),
            public_key: self.derive_address(&private_key),
        })
    }

    pub fn derive_address(&self, private_key: &MinaPrivateKey) -> String {
        private_key.public_key().to_address()
    }

    pub fn derive_credential(&self, args: &DerivationArgs, seed: &Seed) -> Result<GroupedCredential> {
        let private_key = self.derive_private_key(seed, args.account_index, args.address_index)?;
        let address = self.derive_address(&private_key);

        debug!(
            account_index = args.account_index,
            address_index = args.address_index,
            %address,
            "derived mina credential"
        );

        Ok(GroupedCredential::new(Network::Mina, args.account_index, args.address_index, address))
    }

    /// Sign `payload` with the key behind `credential`. The key is
    /// re-derived from the seed on every call.
    pub fn sign(
        &self,
        credential: &GroupedCredential,
        payload: &SignablePayload,
        args: &ChainOperationArgs,
        seed: &Seed,
    ) -> Result<SignedResult> {
        let operation: MinaOperation = args.operation.parse()?;

        let private_key = self.derive_private_key(seed, credential.account_index, credential.address_index)?;
        let public_key = self.derive_address(&private_key);
        if public_key != credential.address {
            return Err(Error::Input(format!(
                "credential {} was not derived from this seed",
                credential.id
            )));
        }

        debug!(
            operation = operation.as_str(),
            network_type = %args.network_type,
            account_index = credential.account_index,
            "signing with mina credential"
        );

        match (operation, payload) {
            (MinaOperation::SignTransaction, SignablePayload::Transaction(body)) => {
                let bytes = signer::transaction_payload(body)?;
                Ok(SignedResult::Transaction(SignedTransaction {
                    signature: signer::sign(&private_key, args.network_type, &bytes)?,
                    public_key,
                    data: body.clone(),
                }))
            }
            (MinaOperation::SignMessage, SignablePayload::Message(body)) => {
                let bytes = signer::message_payload(&body.message);
                Ok(SignedResult::Message(SignedMessage {
                    signature: signer::sign(&private_key, args.network_type, &bytes)?,
                    public_key,
                    data: body.message.clone(),
                }))
            }
            (MinaOperation::SignFields, SignablePayload::Fields(body)) => {
                let bytes = signer::fields_payload(&body.fields);
                Ok(SignedResult::Fields(SignedFields {
                    signature: signer::sign(&private_key, args.network_type, &bytes)?,
                    public_key,
                    data: body.fields.clone(),
                }))
            }
            (MinaOperation::CreateNullifier, SignablePayload::Nullifier(request)) => {
                Ok(SignedResult::Nullifier(nullifier::create(&private_key, &request.message)?))
            }
            (operation, payload) => Err(Error::Input(format!(
                "{} payload cannot be used with {}",
                payload.kind(),
                operation.as_str()
            ))),
        }
    }

    pub fn verify_transaction(&self, signed: &SignedTransaction, network_type: NetworkType) -> Result<bool> {
        let public_key = decode_address(&signed.public_key)?;
        let bytes = signer::transaction_payload(&signed.data)?;
        Ok(signed.data.from == signed.public_key
            && signer::verify(&signed.signature, &public_key, network_type, &bytes))
    }

    pub fn verify_message(&self, signed: &SignedMessage, network_type: NetworkType) -> Result<bool> {
        let public_key = decode_address(&signed.public_key)?;
        let bytes = signer::message_payload(&signed.data);
        Ok(signer::verify(&signed.signature, &public_key, network_type, &bytes))
    }

    pub fn verify_fields(&self, signed: &SignedFields, network_type: NetworkType) -> Result<bool> {
        let public_key = decode_address(&signed.public_key)?;
        let bytes = signer::fields_payload(&signed.data);
        Ok(signer::verify(&signed.signature, &public_key, network_type, &bytes))
    }

    /// Nullifier proofs carry no network domain
    pub fn verify_nullifier(&self, created: &Nullifier) -> Result<bool> {
        nullifier::verify(created)
    }

    /// Reference verifier for every result this driver produces
    pub fn verify(&self, result: &SignedResult, network_type: NetworkType) -> Result<bool> {
        match result {
            SignedResult::Transaction(signed) => self.verify_transaction(signed, network_type),
            SignedResult::Message(signed) => self.verify_message(signed, network_type),
            SignedResult::Fields(signed) => self.verify_fields(signed, network_type),
            SignedResult::Nullifier(created) => self.verify_nullifier(created),
        }
    }

    /// Diagnostics export of the encoded private key
    pub fn export_private_key(&self, args: &DerivationArgs, seed: &Seed) -> Result<Zeroizing<String>> {
        Ok(self.derive_key_material(args, seed)?.private_key)
    }
}
