//! Persistence interface (§6). The SQL engine and migration strategy are an
//! external collaborator per spec; this module only fixes the narrow data
//! contract the indexer and dispatcher share, plus one concrete
//! implementation.

mod model;
mod postgres;

pub use model::{u256_to_decimal, ChainsawStatus, ChannelRow, Output};
pub use postgres::PgStore;

use crate::error::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};

/// The data contract between the indexer, the dispatcher and the channel
/// funding state machine. Column names in the concrete implementation follow
/// §6's `outputs`/`channels`/`chainsaw_status` tables verbatim.
#[async_trait]
pub trait Store: Send + Sync {
    /// Atomically persists one indexer tick: every `Create`/`Spend` upsert
    /// for the polled block range plus the new cursor (§4.E, §5).
    async fn commit_block_range(
        &self,
        upserts: &[Output],
        spent_ids: &[[u8; 32]],
        withdrawals: &[(Address, U256)],
        new_last_seen: u64,
    ) -> Result<()>;

    async fn get_output(&self, id: [u8; 32]) -> Result<Option<Output>>;

    /// An unspent, non-withdrawn `Payment` output of exactly `amount` owned
    /// by `owner`, used by the channel-funding initiator (§4.D step 3).
    async fn find_spendable_output(&self, owner: Address, amount: U256) -> Result<Option<Output>>;

    async fn get_chainsaw_status(&self) -> Result<ChainsawStatus>;

    async fn insert_channel(&self, row: ChannelRow) -> Result<()>;

    async fn get_channel(&self, id: [u8; 32]) -> Result<Option<ChannelRow>>;
}
