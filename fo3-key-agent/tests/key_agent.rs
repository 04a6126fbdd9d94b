//! Tests for the key agent

use std::sync::Arc;

use zeroize::Zeroizing;

use fo3_key_agent::chains::mina::{
    FieldElement, MessageBody, NullifierRequest, SignableFields, TransactionBody, TransactionKind, CREATE_NULLIFIER,
    SIGN_FIELDS, SIGN_MESSAGE, SIGN_TRANSACTION,
};
use fo3_key_agent::crypto::mnemonic::Seed;
use fo3_key_agent::{
    ChainOperationArgs, ChainRegistry, DerivationArgs, Error, GroupedCredential, KeyAgent, KeyAgentConfig,
    KeyAgentState, Network, NetworkType, SignablePayload, SignedResult, StaticPassphrase,
};

const MNEMONIC: &str = "habit hope tip crystal because grunt nation idea electric witness alert like";
const ADDRESS_0: &str = "B62qjsV6WQwTeEWrNrRRBP6VaaLvQhwWTnFi4WP4LQjGvpfZEumXzxb";
const ADDRESS_1: &str = "B62qnhgMG71bvPDvAn3x8dEpXB2sXKCWukj2B6hFKACCHp6uVTCt6HB";

fn passphrase() -> StaticPassphrase {
    StaticPassphrase::new("passphrase")
}

fn wrong_passphrase() -> StaticPassphrase {
    StaticPassphrase::new("not correct passphrase")
}

fn args(account_index: u32) -> DerivationArgs {
    DerivationArgs::new(Network::Mina, account_index, 0, NetworkType::Testnet)
}

fn op(operation: &str) -> ChainOperationArgs {
    ChainOperationArgs::new(Network::Mina, NetworkType::Testnet, operation)
}

async fn agent() -> KeyAgent {
    KeyAgent::from_mnemonic_words(MNEMONIC, None, &passphrase(), KeyAgentConfig::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_export_root_private_key() {
    let seed = Seed::new(hex::decode("000102030405060708090a0b0c0d0e0f").unwrap());
    let agent = KeyAgent::from_seed(seed, &passphrase(), KeyAgentConfig::default()).await.unwrap();

    let root = agent.export_root_private_key(&passphrase()).await.unwrap();
    assert_eq!(
        hex::encode(&root[..]),
        "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
    );
}

#[tokio::test]
async fn test_wrong_passphrase_error_chain() {
    let agent = agent().await;

    let err = agent.export_root_private_key(&wrong_passphrase()).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Failed to export root private key"));
    assert!(message.contains("AuthenticationError"));
    assert!(message.contains("Failed to decrypt seed bytes"));
    assert!(message.contains("invalid tag"));

    let err = agent.decrypt_seed(&wrong_passphrase()).await.unwrap_err();
    assert!(err.to_string().contains("Failed to decrypt root private key"));
}

#[tokio::test]
async fn test_pure_derivation_does_not_store() {
    let agent = agent().await;

    let credential = agent.derive_credentials(&args(0), &passphrase(), true).await.unwrap();
    assert_eq!(credential.address, ADDRESS_0);
    assert!(agent.known_credentials().await.is_empty());

    let stored = agent.derive_credentials(&args(0), &passphrase(), false).await.unwrap();
    assert_eq!(stored, credential);
    assert_eq!(agent.known_credentials().await, vec![credential]);
}

#[tokio::test]
async fn test_credentials_keep_derivation_order() {
    let agent = agent().await;

    for account in [1, 0, 1] {
        agent.derive_credentials(&args(account), &passphrase(), false).await.unwrap();
    }

    let addresses: Vec<String> = agent.known_credentials().await.into_iter().map(|c| c.address).collect();
    assert_eq!(addresses, vec![ADDRESS_1, ADDRESS_0, ADDRESS_1]);
}

#[tokio::test]
async fn test_concurrent_derivations_are_all_stored() {
    let agent = Arc::new(agent().await);

    let handles: Vec<_> = (0..4)
        .map(|account| {
            let agent = agent.clone();
            tokio::spawn(async move { agent.derive_credentials(&args(account), &passphrase(), false).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let mut accounts: Vec<u32> = agent.known_credentials().await.iter().map(|c| c.account_index).collect();
    accounts.sort();
    assert_eq!(accounts, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_serialize_and_restore() {
    let agent = agent().await;
    agent.derive_credentials(&args(0), &passphrase(), false).await.unwrap();

    let state = agent.serializable_data().await;
    let json = state.to_json().unwrap();
    assert!(!json.contains(MNEMONIC));

    let restored = KeyAgent::from_serializable_data(KeyAgentState::from_json(&json).unwrap()).unwrap();
    assert_eq!(restored.serializable_data().await, state);
    assert_eq!(restored.known_credentials().await.len(), 1);

    restored.restore_key_agent(&args(1), &passphrase()).await.unwrap();
    let contents = restored.serializable_data().await.credential_subject.contents;
    assert_eq!(contents[0].address, ADDRESS_0);
    assert_eq!(contents[1].address, ADDRESS_1);
}

#[tokio::test]
async fn test_derive_private_key() {
    let agent = agent().await;
    let private_key = agent.derive_private_key(&args(0), &passphrase()).await.unwrap();
    assert_eq!(private_key.as_str(), "EKExKH31gXH7t5KiYxdyEbtgi22vgX6wnqwmcbrANs9nQJt487iN");
}

#[tokio::test]
async fn test_sign_all_payloads() {
    let agent = agent().await;
    let credential = agent.derive_credentials(&args(0), &passphrase(), true).await.unwrap();

    let transaction = SignablePayload::Transaction(TransactionBody {
        to: ADDRESS_1.to_string(),
        from: ADDRESS_0.to_string(),
        fee: 1,
        amount: Some(100),
        nonce: 0,
        memo: Some("hello Bob".to_string()),
        valid_until: Some(321),
        kind: TransactionKind::Payment,
    });
    let message = SignablePayload::Message(MessageBody {
        message: "Hello, Bob!".to_string(),
    });
    let fields = SignablePayload::Fields(SignableFields {
        fields: vec![FieldElement::from(10), FieldElement::from(20), FieldElement::from(30)],
    });
    let nullifier = SignablePayload::Nullifier(NullifierRequest {
        message: vec![FieldElement::from(14)],
    });

    for (payload, operation) in [
        (transaction, SIGN_TRANSACTION),
        (message, SIGN_MESSAGE),
        (fields, SIGN_FIELDS),
        (nullifier, CREATE_NULLIFIER),
    ] {
        let signed = agent.sign(&credential, &payload, &op(operation), &passphrase()).await.unwrap();
        assert!(agent.verify(&signed, &op(operation)).unwrap(), "{} did not verify", operation);
    }
}

#[tokio::test]
async fn test_signed_message_shape() {
    let agent = agent().await;
    let credential = agent.derive_credentials(&args(0), &passphrase(), true).await.unwrap();
    let payload = SignablePayload::Message(MessageBody {
        message: "Hello, Bob!".to_string(),
    });

    let signed = agent.sign(&credential, &payload, &op(SIGN_MESSAGE), &passphrase()).await.unwrap();
    match &signed {
        SignedResult::Message(message) => {
            assert_eq!(message.public_key, ADDRESS_0);
            assert_eq!(message.data, "Hello, Bob!");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    // testnet signatures do not verify under the mainnet domain
    let mainnet = ChainOperationArgs::new(Network::Mina, NetworkType::Mainnet, SIGN_MESSAGE);
    assert!(!agent.verify(&signed, &mainnet).unwrap());
}

#[tokio::test]
async fn test_nullifier_is_stable() {
    let agent = agent().await;
    let credential = agent.derive_credentials(&args(0), &passphrase(), true).await.unwrap();
    let payload = SignablePayload::Nullifier(NullifierRequest {
        message: vec![FieldElement::from(14)],
    });

    let nullifier = |signed: SignedResult| match signed {
        SignedResult::Nullifier(n) => n.public.nullifier,
        other => panic!("unexpected result: {:?}", other),
    };

    let a = agent.sign(&credential, &payload, &op(CREATE_NULLIFIER), &passphrase()).await.unwrap();
    let b = agent.sign(&credential, &payload, &op(CREATE_NULLIFIER), &passphrase()).await.unwrap();
    assert_eq!(nullifier(a), nullifier(b));
}

#[tokio::test]
async fn test_unsupported_operation() {
    let agent = agent().await;
    let credential = agent.derive_credentials(&args(0), &passphrase(), true).await.unwrap();
    let payload = SignablePayload::Message(MessageBody {
        message: "hi".to_string(),
    });

    let err = agent
        .sign(&credential, &payload, &op("mina_signNotATransaction"), &passphrase())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation(_)));
    assert!(err.to_string().contains("Unsupported private key operation"));
}

#[tokio::test]
async fn test_payload_operation_mismatch() {
    let agent = agent().await;
    let credential = agent.derive_credentials(&args(0), &passphrase(), true).await.unwrap();
    let payload = SignablePayload::Message(MessageBody {
        message: "hi".to_string(),
    });

    let err = agent
        .sign(&credential, &payload, &op(SIGN_TRANSACTION), &passphrase())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Input(_)));
}

#[tokio::test]
async fn test_unregistered_network() {
    let agent = agent().await.with_registry(ChainRegistry::empty());

    let err = agent.derive_credentials(&args(0), &passphrase(), false).await.unwrap_err();
    assert_eq!(err.to_string(), "NetworkError: Unsupported network: Mina");
    assert!(agent.known_credentials().await.is_empty());

    let err = "NotASupportedNetwork".parse::<Network>().unwrap_err();
    assert!(err.to_string().contains("Unsupported network: NotASupportedNetwork"));
}

#[tokio::test]
async fn test_sign_rejects_credential_from_other_network() {
    let agent = agent().await;
    let mut credential = agent.derive_credentials(&args(0), &passphrase(), true).await.unwrap();
    credential.id = format!("did:eth:{}", credential.address);
    let payload = SignablePayload::Message(MessageBody {
        message: "hi".to_string(),
    });

    let err = agent
        .sign(&credential, &payload, &op(SIGN_MESSAGE), &passphrase())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network(_)));
    assert!(err.to_string().contains("does not belong to network Mina"));
}

#[tokio::test]
async fn test_unknown_network_in_request_json() {
    let agent = agent().await;

    let err = serde_json::from_str::<ChainOperationArgs>(
        r#"{"network":"NotAMinaNetwork","networkType":"testnet","operation":"mina_signMessage"}"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("Unsupported network: NotAMinaNetwork"));

    let credential = agent.derive_credentials(&args(0), &passphrase(), true).await.unwrap();
    let mut json = serde_json::to_value(&credential).unwrap();
    json["chain"] = "NotAMinaNetwork".into();
    let err = serde_json::from_value::<GroupedCredential>(json).unwrap_err();
    assert!(err.to_string().contains("Unsupported network: NotAMinaNetwork"));
}

#[tokio::test]
async fn test_sign_with_wrong_passphrase() {
    let agent = agent().await;
    let credential = agent.derive_credentials(&args(0), &passphrase(), true).await.unwrap();
    let payload = SignablePayload::Message(MessageBody {
        message: "hi".to_string(),
    });

    let err = agent
        .sign(&credential, &payload, &op(SIGN_MESSAGE), &wrong_passphrase())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}

#[tokio::test]
async fn test_closure_passphrase_provider() {
    let provider = || async { Ok::<_, Error>(Zeroizing::new(b"passphrase".to_vec())) };
    let agent = KeyAgent::from_mnemonic_words(MNEMONIC, None, &provider, KeyAgentConfig::default())
        .await
        .unwrap();

    let credential = agent.derive_credentials(&args(0), &passphrase(), true).await.unwrap();
    assert_eq!(credential.address, ADDRESS_0);
}
