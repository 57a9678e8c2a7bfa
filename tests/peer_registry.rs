//! Peer admission property (spec §8): for two concurrent session
//! completions carrying the same identity, exactly one is admitted and the
//! other is rejected so its caller can close the transport.

use drawbridge_node::session::{PeerHandle, PeerRegistry};
use drawbridge_node::wire::Message;
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use tokio::sync::mpsc;

fn sample_pubkey(seed: u8) -> PublicKey {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
    PublicKey::from_secret_key(&secp, &secret)
}

#[tokio::test]
async fn duplicate_admission_is_rejected() {
    let registry = PeerRegistry::new();
    let pubkey = sample_pubkey(3);

    let (tx_a, _rx_a) = mpsc::channel::<Message>(4);
    let (tx_b, _rx_b) = mpsc::channel::<Message>(4);

    let first = PeerHandle::new(pubkey, tx_a);
    let second = PeerHandle::new(pubkey, tx_b);

    assert!(registry.admit(first).await);
    assert!(!registry.admit(second).await);
    assert_eq!(registry.len().await, 1);
}

#[tokio::test]
async fn distinct_identities_both_admitted() {
    let registry = PeerRegistry::new();
    let (tx_a, _rx_a) = mpsc::channel::<Message>(4);
    let (tx_b, _rx_b) = mpsc::channel::<Message>(4);

    assert!(registry.admit(PeerHandle::new(sample_pubkey(1), tx_a)).await);
    assert!(registry.admit(PeerHandle::new(sample_pubkey(2), tx_b)).await);
    assert_eq!(registry.len().await, 2);
}

#[tokio::test]
async fn removed_peer_can_be_readmitted() {
    let registry = PeerRegistry::new();
    let pubkey = sample_pubkey(9);
    let (tx_a, _rx_a) = mpsc::channel::<Message>(4);
    let (tx_b, _rx_b) = mpsc::channel::<Message>(4);

    assert!(registry.admit(PeerHandle::new(pubkey, tx_a)).await);
    registry.remove(&pubkey).await;
    assert!(registry.admit(PeerHandle::new(pubkey, tx_b)).await);
}
