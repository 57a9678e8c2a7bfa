use crate::wire::Message;
use secp256k1::PublicKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Handle to a peer's outbound queue and disconnect flag, held by the
/// dispatcher and by the connection manager. The peer's three tasks own the
/// transport itself; nothing outside `session` ever touches the socket.
#[derive(Clone)]
pub struct PeerHandle {
    pub pubkey: PublicKey,
    pub outbound: mpsc::Sender<Message>,
    pub lnd_identity: Arc<Mutex<Option<Vec<u8>>>>,
    disconnect: Arc<tokio::sync::Notify>,
}

impl PeerHandle {
    pub fn new(pubkey: PublicKey, outbound: mpsc::Sender<Message>) -> Self {
        PeerHandle {
            pubkey,
            outbound,
            lnd_identity: Arc::new(Mutex::new(None)),
            disconnect: Arc::new(tokio::sync::Notify::new()),
        }
    }

    /// Sets the cooperative disconnect flag observed by the reader, writer
    /// and pinger tasks at their next loop boundary (§4.C, §5).
    pub fn request_shutdown(&self) {
        self.disconnect.notify_waiters();
    }

    pub fn disconnect_signal(&self) -> Arc<tokio::sync::Notify> {
        self.disconnect.clone()
    }
}

/// Process-wide map from a peer's compressed identity to its handle.
/// Admission is first-writer-wins (§4.C): inserting over an existing entry
/// is rejected rather than replacing it.
#[derive(Clone, Default)]
pub struct PeerRegistry {
    inner: Arc<Mutex<HashMap<[u8; 33], PeerHandle>>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        PeerRegistry::default()
    }

    /// Returns `true` if `handle` was admitted, `false` if a session for the
    /// same `NodeKey` was already present (the caller must then close the
    /// new transport).
    pub async fn admit(&self, handle: PeerHandle) -> bool {
        let key = handle.pubkey.serialize();
        let mut map = self.inner.lock().await;
        if map.contains_key(&key) {
            return false;
        }
        map.insert(key, handle);
        true
    }

    pub async fn remove(&self, pubkey: &PublicKey) {
        let mut map = self.inner.lock().await;
        map.remove(&pubkey.serialize());
    }

    pub async fn get(&self, pubkey: &PublicKey) -> Option<PeerHandle> {
        let map = self.inner.lock().await;
        map.get(&pubkey.serialize()).cloned()
    }

    pub async fn contains(&self, pubkey: &PublicKey) -> bool {
        let map = self.inner.lock().await;
        map.contains_key(&pubkey.serialize())
    }

    pub async fn all(&self) -> Vec<PeerHandle> {
        let map = self.inner.lock().await;
        map.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}
