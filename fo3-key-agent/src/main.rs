//! FO3 Key Agent CLI
//!
//! The passphrase is read from `KEY_AGENT_PASSPHRASE` and the mnemonic for
//! `create` from `KEY_AGENT_MNEMONIC`. Neither is ever printed.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zeroize::Zeroizing;

use fo3_key_agent::chains::mina::{MessageBody, SIGN_MESSAGE};
use fo3_key_agent::crypto::{generate_mnemonic, MnemonicStrength};
use fo3_key_agent::{
    ChainOperationArgs, DerivationArgs, KeyAgent, KeyAgentConfig, KeyAgentState, Network, NetworkType,
    SignablePayload, StaticPassphrase,
};

const PASSPHRASE_VAR: &str = "KEY_AGENT_PASSPHRASE";

#[derive(Parser)]
#[command(name = "fo3-key-agent")]
#[command(about = "FO3 key agent: mnemonic, derivation and signing")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Network type override (mainnet or testnet)
    #[arg(short, long, env = "KEY_AGENT_NETWORK_TYPE")]
    network_type: Option<NetworkType>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh mnemonic
    Generate {
        #[arg(short, long, default_value_t = 12)]
        words: usize,
    },
    /// Create an agent from KEY_AGENT_MNEMONIC and write its state
    Create {
        #[arg(short, long)]
        state: PathBuf,
    },
    /// Derive a Mina credential
    Derive {
        #[arg(short, long)]
        state: PathBuf,
        #[arg(long, default_value_t = 0)]
        account: u32,
        #[arg(long, default_value_t = 0)]
        address: u32,
        /// Append the credential to the stored state
        #[arg(long)]
        store: bool,
    },
    /// Sign a UTF-8 message
    SignMessage {
        #[arg(short, long)]
        state: PathBuf,
        #[arg(long, default_value_t = 0)]
        account: u32,
        #[arg(long, default_value_t = 0)]
        address: u32,
        #[arg(short, long)]
        message: String,
    },
    /// Print the hex root private key
    ExportRoot {
        #[arg(short, long)]
        state: PathBuf,
    },
}

fn load_agent(path: &Path) -> anyhow::Result<KeyAgent> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(KeyAgent::from_serializable_data(KeyAgentState::from_json(&json)?)?)
}

async fn save_agent(agent: &KeyAgent, path: &Path) -> anyhow::Result<()> {
    let json = agent.serializable_data().await.to_json()?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = KeyAgentConfig::from_env();
    let network_type = cli.network_type.unwrap_or(config.network_type);

    match cli.command {
        Commands::Generate { words } => {
            let strength = MnemonicStrength::from_word_count(words)?;
            println!("{}", Zeroizing::new(generate_mnemonic(strength)?).as_str());
        }
        Commands::Create { state } => {
            let mnemonic = Zeroizing::new(std::env::var("KEY_AGENT_MNEMONIC").context("KEY_AGENT_MNEMONIC is not set")?);
            let provider = StaticPassphrase::from_env(PASSPHRASE_VAR)?;

            let agent = KeyAgent::from_mnemonic_words(&mnemonic, None, &provider, config).await?;
            save_agent(&agent, &state).await?;
            info!(path = %state.display(), "wrote key agent state");
        }
        Commands::Derive { state, account, address, store } => {
            let agent = load_agent(&state)?;
            let provider = StaticPassphrase::from_env(PASSPHRASE_VAR)?;
            let args = DerivationArgs::new(Network::Mina, account, address, network_type);

            let credential = agent.derive_credentials(&args, &provider, !store).await?;
            if store {
                save_agent(&agent, &state).await?;
            }
            println!("{}", serde_json::to_string_pretty(&credential)?);
        }
        Commands::SignMessage { state, account, address, message } => {
            let agent = load_agent(&state)?;
            let provider = StaticPassphrase::from_env(PASSPHRASE_VAR)?;

            let known = agent
                .known_credentials()
                .await
                .into_iter()
                .find(|c| c.matches(Network::Mina, account, address));
            let credential = match known {
                Some(credential) => credential,
                None => {
                    let args = DerivationArgs::new(Network::Mina, account, address, network_type);
                    agent.derive_credentials(&args, &provider, true).await?
                }
            };

            let payload = SignablePayload::Message(MessageBody { message });
            let args = ChainOperationArgs::new(Network::Mina, network_type, SIGN_MESSAGE);
            let signed = agent.sign(&credential, &payload, &args, &provider).await?;
            println!("{}", serde_json::to_string_pretty(&signed)?);
        }
        Commands::ExportRoot { state } => {
            let agent = load_agent(&state)?;
            let provider = StaticPassphrase::from_env(PASSPHRASE_VAR)?;

            let root = agent.export_root_private_key(&provider).await?;
            println!("{}", Zeroizing::new(hex::encode(&root[..])).as_str());
        }
    }

    Ok(())
}
