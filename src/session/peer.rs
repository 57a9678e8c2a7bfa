use crate::session::registry::{PeerHandle, PeerRegistry};
use crate::session::transport::SecureChannel;
use crate::wire::Message;
use secp256k1::PublicKey;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const WRITE_DEADLINE: Duration = Duration::from_secs(10);
const PING_INTERVAL: Duration = Duration::from_secs(60);
const PING_PADDING_LEN: usize = 16;
const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// Admits a freshly Noise-handshaken connection into the registry and spawns
/// its reader, writer and pinger tasks (§4.C). Returns `None` if the
/// registry already holds a session for the same identity (first-writer-wins
/// admission); the caller is then responsible for dropping the transport.
pub async fn spawn_peer_session(
    channel: SecureChannel,
    registry: PeerRegistry,
    inbound_tx: mpsc::Sender<(PublicKey, Message)>,
) -> Option<PeerHandle> {
    let pubkey = channel.remote_static;
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
    let handle = PeerHandle::new(pubkey, outbound_tx.clone());

    if !registry.admit(handle.clone()).await {
        tracing::warn!(?pubkey, "rejecting duplicate session for already-registered peer");
        return None;
    }

    let (mut reader, mut writer) = channel.into_split();
    let disconnect = handle.disconnect_signal();

    // §4.C: the local side's Init must be the first application message.
    let local_init = Message::Init {
        lnd_pub: pubkey,
        lnd_host: String::new(),
    };
    let _ = outbound_tx.send(local_init).await;

    let reader_disconnect = disconnect.clone();
    let reader_task = tokio::spawn(async move {
        loop {
            let recv = reader.recv();
            tokio::select! {
                _ = reader_disconnect.notified() => {
                    tracing::debug!(?pubkey, "reader observed shutdown flag");
                    return;
                }
                outcome = timeout(IDLE_TIMEOUT, recv) => {
                    match outcome {
                        Err(_) => {
                            tracing::info!(?pubkey, "idle timeout, tearing down session");
                            return;
                        }
                        Ok(Err(e)) => {
                            tracing::info!(?pubkey, error = %e, "transport closed");
                            return;
                        }
                        Ok(Ok(msg)) => {
                            if inbound_tx.send((pubkey, msg)).await.is_err() {
                                tracing::warn!(?pubkey, "dispatcher inbound channel closed");
                                return;
                            }
                        }
                    }
                }
            }
        }
    });

    let writer_disconnect = disconnect.clone();
    let mut outbound_rx = outbound_rx;
    let writer_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = writer_disconnect.notified() => {
                    tracing::debug!(?pubkey, "writer observed shutdown flag");
                    return;
                }
                msg = outbound_rx.recv() => {
                    let Some(msg) = msg else {
                        return;
                    };
                    match timeout(WRITE_DEADLINE, writer.send(&msg)).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            tracing::info!(?pubkey, error = %e, "write failed, tearing down");
                            return;
                        }
                        Err(_) => {
                            tracing::info!(?pubkey, "write deadline exceeded, tearing down");
                            return;
                        }
                    }
                }
            }
        }
    });

    let pinger_disconnect = disconnect.clone();
    let ping_outbound = outbound_tx.clone();
    let pinger_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = pinger_disconnect.notified() => {
                    return;
                }
                _ = tokio::time::sleep(PING_INTERVAL) => {
                    let ping = Message::Ping { padding: vec![0u8; PING_PADDING_LEN] };
                    if ping_outbound.send(ping).await.is_err() {
                        return;
                    }
                }
            }
        }
    });

    let registry = registry.clone();
    let teardown_handle = handle.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = reader_task => {}
            _ = writer_task => {}
            _ = pinger_task => {}
        }
        teardown_handle.request_shutdown();
        registry.remove(&pubkey).await;
        tracing::info!(?pubkey, "peer session torn down");
    });

    Some(handle)
}
