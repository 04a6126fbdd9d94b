//! Key agent: owns the encrypted seed and the derived credentials

mod key_agent;
mod passphrase;
mod state;

pub use key_agent::KeyAgent;
pub use passphrase::{PassphraseProvider, StaticPassphrase};
pub use state::{CredentialSubject, KeyAgentKind, KeyAgentState, STATE_TYPES};
