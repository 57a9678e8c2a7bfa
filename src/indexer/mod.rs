//! The polling chain indexer ("chainsaw", §4.E): the only writer of on-chain
//! state into persistence. Grounded in `examples/get10101-10101`'s
//! `node/background.rs`-style periodic task pattern, generalized from
//! on-chain-wallet sync to contract-log polling.

pub mod await_output;
mod events;

pub use await_output::await_output;

use crate::eth::EthClient;
use crate::store::{Output, Store};
use ethers::types::U256;
use events::ChainEvent;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Runs the indexer loop until the process shuts down. Never returns under
/// normal operation; errors from a single tick are logged and the loop
/// continues at the next interval rather than terminating the task.
pub async fn run(eth: Arc<EthClient>, store: Arc<dyn Store>, confirmation_count: u64) -> ! {
    let mut ticker = tokio::time::interval(POLL_INTERVAL);
    loop {
        ticker.tick().await;
        if let Err(e) = tick(&eth, &*store, confirmation_count).await {
            warn!(error = %e, "indexer tick failed");
        }
    }
}

async fn tick(eth: &EthClient, store: &dyn Store, confirmation_count: u64) -> crate::error::Result<()> {
    let status = store.get_chainsaw_status().await?;
    let height = eth.block_number().await?;
    let confirmed_height = height.saturating_sub(confirmation_count);

    if confirmed_height <= status.last_seen_block {
        return Ok(());
    }

    let logs = eth.get_logs(status.last_seen_block, confirmed_height).await?;

    let mut upserts = Vec::new();
    let mut spent_ids = Vec::new();
    let mut withdrawals: Vec<(ethers::types::Address, U256)> = Vec::new();

    for log in &logs {
        match events::parse_log(log) {
            Some(ChainEvent::Create {
                value,
                script,
                id,
                block_number,
                tx_hash,
            }) => {
                upserts.push(Output {
                    id,
                    contract_address: eth.contract_address(),
                    amount: value,
                    block_number,
                    tx_hash,
                    script,
                    spent: false,
                    withdrawn: false,
                });
            }
            Some(ChainEvent::Spend { id }) => spent_ids.push(id),
            Some(ChainEvent::Withdrawal { owner, value }) => withdrawals.push((owner, value)),
            None => {
                if let Some(topic) = log.topics.first() {
                    warn!(?topic, "skipping log with unrecognized topic0");
                }
            }
        }
    }

    info!(
        from = status.last_seen_block,
        to = confirmed_height,
        creates = upserts.len(),
        spends = spent_ids.len(),
        withdrawals = withdrawals.len(),
        "indexer tick"
    );

    store
        .commit_block_range(&upserts, &spent_ids, &withdrawals, confirmed_height)
        .await
}
