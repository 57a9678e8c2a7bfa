//! The protocol dispatcher (§4.D): a single run loop serializing handler
//! execution over the union of all peer inbound channels, plus the channel
//! funding and cross-chain swap state machines it owns.
//!
//! Grounded in the teacher's `node/message_handler.rs` single-consumer
//! pattern, generalized from LDK's `PeerManager` callback surface to this
//! crate's own message registry.

mod channel;
mod init;
mod ping;
mod swap;

pub use channel::ChannelInfo;
pub use swap::PendingSwap;

use crate::eth::EthClient;
use crate::keys::WalletKey;
use crate::lnd::LndClient;
use crate::session::PeerRegistry;
use crate::store::Store;
use crate::wire::Message;
use ethers::types::U256;
use secp256k1::PublicKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Everything a handler needs: shared state plus the collaborators defined
/// as external interfaces (§1, §6). Cheap to clone; every field is already
/// `Arc`/`Clone`-backed.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) wallet_key: WalletKey,
    pub(crate) registry: PeerRegistry,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) eth: Arc<EthClient>,
    pub(crate) lnd: Arc<dyn LndClient>,
    pub(crate) pending_channels: Arc<Mutex<HashMap<[u8; 32], channel::PendingChannel>>>,
    pub(crate) open_channels: Arc<Mutex<HashMap<[u8; 32], ChannelInfo>>>,
    pub(crate) pending_swaps: Arc<Mutex<HashMap<[u8; 32], PendingSwap>>>,
}

impl Dispatcher {
    pub fn new(
        wallet_key: WalletKey,
        registry: PeerRegistry,
        store: Arc<dyn Store>,
        eth: Arc<EthClient>,
        lnd: Arc<dyn LndClient>,
    ) -> Self {
        Dispatcher {
            wallet_key,
            registry,
            store,
            eth,
            lnd,
            pending_channels: Arc::new(Mutex::new(HashMap::new())),
            open_channels: Arc::new(Mutex::new(HashMap::new())),
            pending_swaps: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Consumes the union of all peer inbound channels until the sender side
    /// is dropped (process shutdown). Handler precedence is Ping/Pong → Init
    /// → Channel → Swap, expressed directly by the match below since each
    /// message type maps to exactly one handler.
    pub async fn run(self, mut inbound_rx: mpsc::Receiver<(PublicKey, Message)>) {
        while let Some((peer, msg)) = inbound_rx.recv().await {
            let this = self.clone();
            this.dispatch(peer, msg).await;
        }
    }

    async fn dispatch(&self, peer: PublicKey, msg: Message) {
        let msg_type = msg.msg_type();
        let reply = match msg {
            Message::Ping { padding } => Some(ping::handle_ping(padding)),
            Message::Pong { .. } => None,
            Message::Init { lnd_pub, lnd_host } => {
                init::handle_init(self, &peer, lnd_pub, lnd_host).await;
                None
            }
            Message::OpenChannel { .. } => channel::handle_open_channel(self, &peer, msg)
                .await
                .unwrap_or_else(|e| {
                    log_handler_error(&peer, msg_type, e);
                    None
                }),
            Message::AcceptChannel { .. } => channel::handle_accept_channel(self, &peer, msg)
                .await
                .unwrap_or_else(|e| {
                    log_handler_error(&peer, msg_type, e);
                    None
                }),
            Message::FundingCreated { .. } => channel::handle_funding_created(self, &peer, msg)
                .await
                .unwrap_or_else(|e| {
                    log_handler_error(&peer, msg_type, e);
                    None
                }),
            Message::FundingSigned { .. } => {
                channel::handle_funding_signed(self, &peer, msg)
                    .await;
                None
            }
            Message::FundingLocked { .. } => {
                channel::handle_funding_locked(self, &peer, msg).await;
                None
            }
            Message::InitiateSwap { .. } => swap::handle_initiate_swap(self, &peer, msg)
                .await
                .unwrap_or_else(|e| {
                    log_handler_error(&peer, msg_type, e);
                    None
                }),
            Message::SwapAccepted { .. } => swap::handle_swap_accepted(self, &peer, msg)
                .await
                .unwrap_or_else(|e| {
                    log_handler_error(&peer, msg_type, e);
                    None
                }),
            Message::InvoiceGenerated { .. } => swap::handle_invoice_generated(self, &peer, msg)
                .await
                .unwrap_or_else(|e| {
                    log_handler_error(&peer, msg_type, e);
                    None
                }),
            Message::InvoiceExecuted { .. } => {
                swap::handle_invoice_executed(self, msg).await;
                None
            }
        };

        if let Some(reply) = reply {
            self.send(&peer, reply).await;
        }
    }

    pub(crate) async fn send(&self, peer: &PublicKey, msg: Message) {
        match self.registry.get(peer).await {
            Some(handle) => {
                if handle.outbound.send(msg).await.is_err() {
                    debug!(%peer, "outbound queue closed, peer already torn down");
                }
            }
            None => warn!(%peer, "attempted to reply to a peer no longer in the registry"),
        }
    }

    /// The core's public entrypoint for opening a channel, normally invoked
    /// by the out-of-scope RPC surface (§6).
    pub async fn init_channel(&self, peer: PublicKey, amount: U256) -> crate::error::Result<()> {
        channel::init_channel(self, peer, amount).await
    }

    /// The core's public entrypoint for starting a swap (§6).
    pub async fn init_swap(
        &self,
        peer: PublicKey,
        eth_amount: U256,
        btc_amount: u64,
    ) -> crate::error::Result<()> {
        swap::init_swap(self, peer, eth_amount, btc_amount).await
    }
}

fn log_handler_error(peer: &PublicKey, msg_type: u16, err: crate::error::Error) {
    warn!(%peer, msg_type, error = %err, "handler failed");
}
