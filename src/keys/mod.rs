//! Key & signature service (§4.B): node transport identities, wallet signing
//! identities, and the compact-recoverable signature scheme shared by the
//! spend engine and the protocol state machines.

mod node_key;
mod signature;
mod wallet_key;

pub use node_key::NodeKey;
pub use signature::Signature;
pub use wallet_key::{address_from_pubkey, recover, verify, WalletKey};
