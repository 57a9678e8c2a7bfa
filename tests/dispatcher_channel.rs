//! Channel-funding idempotence property (spec §8): two successive
//! `OpenChannel` messages carrying the same `pending_channel_id` from the
//! same peer must produce exactly one pending-channel record and exactly
//! one `AcceptChannel` reply; the second is dropped by the handler.

use async_trait::async_trait;
use drawbridge_node::dispatcher::Dispatcher;
use drawbridge_node::error::Result;
use drawbridge_node::eth::EthClient;
use drawbridge_node::keys::WalletKey;
use drawbridge_node::lnd::{LightningChannel, LndClient};
use drawbridge_node::session::{PeerHandle, PeerRegistry};
use drawbridge_node::store::{ChainsawStatus, ChannelRow, Output, Store};
use drawbridge_node::wire::Message;
use ethers::types::{Address, U256};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::timeout;

struct NullStore;

#[async_trait]
impl Store for NullStore {
    async fn commit_block_range(
        &self,
        _upserts: &[Output],
        _spent_ids: &[[u8; 32]],
        _withdrawals: &[(Address, U256)],
        _new_last_seen: u64,
    ) -> Result<()> {
        Ok(())
    }

    async fn get_output(&self, _id: [u8; 32]) -> Result<Option<Output>> {
        Ok(None)
    }

    async fn find_spendable_output(&self, _owner: Address, _amount: U256) -> Result<Option<Output>> {
        Ok(None)
    }

    async fn get_chainsaw_status(&self) -> Result<ChainsawStatus> {
        Ok(ChainsawStatus {
            last_seen_block: 0,
            last_polled_at: SystemTime::now(),
        })
    }

    async fn insert_channel(&self, _row: ChannelRow) -> Result<()> {
        Ok(())
    }

    async fn get_channel(&self, _id: [u8; 32]) -> Result<Option<ChannelRow>> {
        Ok(None)
    }
}

struct NullLnd;

#[async_trait]
impl LndClient for NullLnd {
    async fn connect_peer(&self, _pubkey: &str, _host: &str) -> Result<()> {
        Ok(())
    }

    async fn list_channels(&self, _peer_pubkey: &str) -> Result<Vec<LightningChannel>> {
        Ok(vec![])
    }

    async fn add_invoice(&self, _value_sat: i64, _preimage: [u8; 32]) -> Result<String> {
        Ok(String::new())
    }

    async fn pay_invoice(&self, _payment_request: &str) -> Result<[u8; 32]> {
        Ok([0u8; 32])
    }
}

fn sample_pubkey(seed: u8) -> PublicKey {
    let secp = Secp256k1::new();
    let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
    PublicKey::from_secret_key(&secp, &secret)
}

async fn build_dispatcher() -> (Dispatcher, PeerRegistry) {
    let registry = PeerRegistry::new();
    let eth = EthClient::new("http://127.0.0.1:1", Address::zero(), 1, &[7u8; 32])
        .await
        .expect("constructing EthClient never touches the network");
    let dispatcher = Dispatcher::new(
        WalletKey::generate(),
        registry.clone(),
        std::sync::Arc::new(NullStore),
        std::sync::Arc::new(eth),
        std::sync::Arc::new(NullLnd),
    );
    (dispatcher, registry)
}

#[tokio::test]
async fn duplicate_open_channel_yields_one_accept() {
    let (dispatcher, registry) = build_dispatcher().await;

    let peer_pubkey = sample_pubkey(42);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(8);
    registry
        .admit(PeerHandle::new(peer_pubkey, outbound_tx))
        .await;

    let (inbound_tx, inbound_rx) = mpsc::channel(8);
    tokio::spawn(dispatcher.run(inbound_rx));

    let open = Message::OpenChannel {
        pending_channel_id: [0x42; 32],
        amount: U256::from(100_000u64),
        csv_delay: 7,
        max_htlcs: 2,
        funding_key: peer_pubkey,
    };
    inbound_tx.send((peer_pubkey, open.clone())).await.unwrap();
    inbound_tx.send((peer_pubkey, open)).await.unwrap();

    let first = timeout(Duration::from_secs(1), outbound_rx.recv())
        .await
        .expect("first reply should arrive")
        .expect("channel open");
    assert!(matches!(first, Message::AcceptChannel { .. }));

    let second = timeout(Duration::from_millis(200), outbound_rx.recv()).await;
    assert!(second.is_err(), "duplicate OpenChannel must not produce a second reply");
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let (dispatcher, registry) = build_dispatcher().await;

    let peer_pubkey = sample_pubkey(7);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Message>(8);
    registry
        .admit(PeerHandle::new(peer_pubkey, outbound_tx))
        .await;

    let (inbound_tx, inbound_rx) = mpsc::channel(8);
    tokio::spawn(dispatcher.run(inbound_rx));

    inbound_tx
        .send((
            peer_pubkey,
            Message::Ping {
                padding: vec![1, 2, 3],
            },
        ))
        .await
        .unwrap();

    let reply = timeout(Duration::from_secs(1), outbound_rx.recv())
        .await
        .unwrap()
        .unwrap();
    match reply {
        Message::Pong { padding } => assert_eq!(padding, vec![1, 2, 3]),
        other => panic!("expected Pong, got {other:?}"),
    }
}
