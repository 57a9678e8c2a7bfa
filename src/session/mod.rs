//! Peer session layer (§4.C): Noise-framed transport, the peer registry, and
//! the per-peer reader/writer/pinger tasks.

mod connection_manager;
mod peer;
mod registry;
mod transport;

pub use connection_manager::{BootstrapPeer, ConnectionManager};
pub use peer::spawn_peer_session;
pub use registry::{PeerHandle, PeerRegistry};
pub use transport::SecureChannel;
