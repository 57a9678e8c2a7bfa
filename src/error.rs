use thiserror::Error;

/// The error taxonomy fixed by the data contract between the wire, session,
/// dispatcher and indexer components. Handler-level errors are logged and
/// swallowed (see `dispatcher`); this type only crosses module boundaries.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to decode message: {0}")]
    DecodingError(String),

    #[error("unknown message type {0}")]
    UnknownMessage(u16),

    #[error("witness plus signature length {0} exceeds 65535 bytes")]
    WitnessOverflow(usize),

    #[error("no pending channel for id {0}")]
    UnknownPendingChannel(String),

    #[error("pending channel id {0} already tracked")]
    DuplicatePendingChannelID(String),

    #[error("no spendable output of amount {0} owned by the local wallet")]
    InsufficientFunds(u128),

    #[error("commitment signature does not recover to the expected address")]
    BadCommitmentSignature,

    #[error("timed out waiting for funding output to confirm")]
    FundingConfirmationTimeout,

    #[error("no open channel with peer for the requested amount")]
    NoSuitableChannel,

    #[error("no lightning channel with the peer's lnd node")]
    NoLightningChannel,

    #[error("swap id {0} already tracked")]
    DuplicateSwapID(String),

    #[error("no pending swap for id {0}")]
    UnknownSwap(String),

    #[error("transport closed")]
    TransportClosed,

    #[error("transport operation timed out")]
    TransportTimeout,

    #[error("persistence error: {0}")]
    PersistenceError(String),

    #[error("on-chain call rejected: {0}")]
    OnChainRejected(String),

    #[error("indexer has stalled: {0}")]
    IndexerStalled(String),

    #[error("lightning-daemon call failed: {0}")]
    LndCallFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
