use crate::keys::NodeKey;
use crate::session::peer::spawn_peer_session;
use crate::session::registry::PeerRegistry;
use crate::session::transport::SecureChannel;
use crate::wire::Message;
use secp256k1::PublicKey;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// A configured bootstrap peer (`host:port|pubkey-hex`, §6).
#[derive(Clone, Debug)]
pub struct BootstrapPeer {
    pub address: SocketAddr,
    pub pubkey: PublicKey,
}

/// Accepts inbound connections and dials configured bootstrap peers at
/// startup, retrying dials on failure. Grounded in the teacher's
/// `node::connect` retry loop (`node/connection.rs`), adapted from LDK's
/// connect-outbound pattern to this crate's own Noise transport.
pub struct ConnectionManager {
    local_key: NodeKey,
    registry: PeerRegistry,
    inbound_tx: mpsc::Sender<(PublicKey, Message)>,
}

impl ConnectionManager {
    pub fn new(
        local_key: NodeKey,
        registry: PeerRegistry,
        inbound_tx: mpsc::Sender<(PublicKey, Message)>,
    ) -> Self {
        ConnectionManager {
            local_key,
            registry,
            inbound_tx,
        }
    }

    /// Binds the listen address. Bind failure is one of the three fatal
    /// start-up conditions (§7), so this returns eagerly rather than from
    /// inside the spawned accept loop, letting the caller propagate it out
    /// of `main` instead of discovering it only via a log line.
    pub async fn bind(listen_addr: SocketAddr) -> std::io::Result<TcpListener> {
        TcpListener::bind(listen_addr).await
    }

    /// Spawns the accept loop over an already-bound listener as a background task.
    pub fn spawn_accept_loop(&self, listener: TcpListener) -> tokio::task::JoinHandle<()> {
        let local_key = self.local_key.clone();
        let registry = self.registry.clone();
        let inbound_tx = self.inbound_tx.clone();
        tokio::spawn(async move {
            tracing::info!("listening for peer connections");
            loop {
                match listener.accept().await {
                    Ok((stream, remote)) => {
                        let local_key = local_key.clone();
                        let registry = registry.clone();
                        let inbound_tx = inbound_tx.clone();
                        tokio::spawn(async move {
                            match SecureChannel::handshake_inbound(stream, &local_key).await {
                                Ok(channel) => {
                                    spawn_peer_session(channel, registry, inbound_tx).await;
                                }
                                Err(e) => {
                                    tracing::warn!(%remote, error = %e, "inbound handshake failed");
                                }
                            }
                        });
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                    }
                }
            }
        })
    }

    /// Dials every bootstrap peer once at startup, retrying a fixed 1-second
    /// interval on failure bounded by a 30-second attempt timeout, matching
    /// the teacher's retry shape.
    pub async fn dial_bootstrap_peers(&self, peers: Vec<BootstrapPeer>) {
        for peer in peers {
            let local_key = self.local_key.clone();
            let registry = self.registry.clone();
            let inbound_tx = self.inbound_tx.clone();
            tokio::spawn(async move {
                loop {
                    let attempt = tokio::time::timeout(Duration::from_secs(30), async {
                        let stream = tokio::net::TcpStream::connect(peer.address)
                            .await
                            .map_err(|_| crate::error::Error::TransportClosed)?;
                        SecureChannel::handshake_outbound(stream, &local_key, peer.pubkey).await
                    })
                    .await;

                    match attempt {
                        Ok(Ok(channel)) => {
                            spawn_peer_session(channel, registry.clone(), inbound_tx.clone())
                                .await;
                            return;
                        }
                        Ok(Err(e)) => {
                            tracing::debug!(peer = %peer.address, error = %e, "connect failed, retrying");
                        }
                        Err(_) => {
                            tracing::debug!(peer = %peer.address, "connect attempt timed out, retrying");
                        }
                    }
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            });
        }
    }
}
