//! `drawbridge-node`: a peer-to-peer node bridging Lightning-style Bitcoin
//! payment channels and an Ethereum-style UTXO smart-contract chain.
//!
//! `config` and `main` wire these modules together into the running
//! process; everything below is usable as a library on its own, mirroring
//! the teacher's workspace split between a thin binary and a reusable core.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod eth;
pub mod indexer;
pub mod keccak;
pub mod keys;
pub mod lnd;
pub mod session;
pub mod spend;
pub mod store;
pub mod units;
pub mod wire;
