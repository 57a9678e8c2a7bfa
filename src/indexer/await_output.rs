//! `await_output(id, ctx) -> Output | CancelErr | TimeoutErr` (§4.E, §5):
//! polls persistence every 10 seconds for a row with the given id, returning
//! as soon as one appears or the caller's deadline/cancellation fires.

use crate::error::{Error, Result};
use crate::store::{Output, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Polls until `id` appears in persistence, `cancel` is notified, or
/// `deadline` elapses. Channel funding (§4.D step 4) calls this with a
/// 5-minute outer timeout wrapped around the whole call.
pub async fn await_output(
    store: &dyn Store,
    id: [u8; 32],
    cancel: Arc<Notify>,
    deadline: Duration,
) -> Result<Output> {
    tokio::time::timeout(deadline, async move {
        loop {
            if let Some(output) = store.get_output(id).await? {
                return Ok(output);
            }

            tokio::select! {
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
                _ = cancel.notified() => {
                    return Err(Error::TransportClosed);
                }
            }
        }
    })
    .await
    .map_err(|_| Error::FundingConfirmationTimeout)?
}
