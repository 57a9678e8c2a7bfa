use crate::dispatcher::Dispatcher;
use secp256k1::PublicKey;
use tracing::{info, warn};

/// On `Init{lnd_pub, lnd_host}`: connect the local lightning-daemon to the
/// peer's, recording `lnd_pub` on success. On failure the peer is not
/// salvageable (§4.D), so its session is torn down rather than left half
/// set up.
pub async fn handle_init(dispatcher: &Dispatcher, peer: &PublicKey, lnd_pub: PublicKey, lnd_host: String) {
    let lnd_pub_hex = hex::encode(lnd_pub.serialize());

    match dispatcher.lnd.connect_peer(&lnd_pub_hex, &lnd_host).await {
        Ok(()) => {
            if let Some(handle) = dispatcher.registry.get(peer).await {
                *handle.lnd_identity.lock().await = Some(lnd_pub.serialize().to_vec());
            }
            info!(%peer, lnd_pub = %lnd_pub_hex, "associated peer with lightning-daemon identity");
        }
        Err(e) => {
            warn!(%peer, error = %e, "lnd ConnectPeer failed, closing peer");
            if let Some(handle) = dispatcher.registry.get(peer).await {
                handle.request_shutdown();
            }
            dispatcher.registry.remove(peer).await;
        }
    }
}
