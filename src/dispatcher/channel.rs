//! The channel funding four-way handshake (§4.D). Both initiator and
//! responder sides share one `PendingChannel` map; an entry is keyed by
//! `pending_channel_id` until the funding output id (== `channel_id`, §9) is
//! known, then re-keyed to `channel_id` for the remainder of the handshake,
//! since `FundingSigned`/`FundingLocked` address the channel by that id.

use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::indexer::await_output;
use crate::keys::{address_from_pubkey, verify};
use crate::spend::{gen_output_ids, sig_data, wire_data, OutputScript, SpendRequest, Witness};
use crate::store::ChannelRow;
use crate::wire::Message;
use ethers::types::{Address, U256};
use secp256k1::PublicKey;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{info, warn};
use std::sync::Arc;

const FUNDING_CSV_DELAY: u16 = 7;
const FUNDING_MAX_HTLCS: u16 = 2;
const FUNDING_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub(crate) enum PendingChannel {
    /// Initiator, keyed by `pending_channel_id`, after sending `OpenChannel`.
    AwaitingAccept { funding_amount: U256 },
    /// Responder, keyed by `pending_channel_id`, after replying `AcceptChannel`.
    AwaitingFundingCreated {
        their_pub: PublicKey,
        funding_amount: U256,
    },
    /// Initiator, keyed by `channel_id`, after sending `FundingCreated`.
    AwaitingFundingSigned {
        their_pub: PublicKey,
        our_addr: Address,
        their_addr: Address,
        funding_amount: U256,
        input_id: [u8; 32],
        our_sig: crate::keys::Signature,
    },
    /// Either side, keyed by `channel_id`, waiting for the peer's
    /// `FundingLocked` acknowledgment. `sent_locked` is `true` once this
    /// side has already sent its own.
    AwaitingFundingLocked {
        counterparty: PublicKey,
        funding_amount: U256,
        sent_locked: bool,
    },
}

/// A finalized channel as the dispatcher's in-memory record (§5's
/// `channel_id → Channel` mapping); the durable row lives in [`ChannelRow`].
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub counterparty: PublicKey,
    pub funding_output_id: [u8; 32],
    pub funding_amount: U256,
}

fn funding_spend_request(
    input_id: [u8; 32],
    funding_amount: U256,
    a: Address,
    b: Address,
) -> SpendRequest {
    SpendRequest::new(
        input_id,
        Witness::Payment,
        vec![funding_amount],
        vec![OutputScript::multisig(a, b)],
    )
}

/// `InitChannel(peer, amount)` (§4.D, §6): the initiator side's entrypoint.
pub async fn init_channel(dispatcher: &Dispatcher, peer: PublicKey, amount: U256) -> Result<()> {
    let pending_channel_id: [u8; 32] = rand::random();
    let our_pub = dispatcher.wallet_key.public_key();

    dispatcher.pending_channels.lock().await.insert(
        pending_channel_id,
        PendingChannel::AwaitingAccept {
            funding_amount: amount,
        },
    );

    dispatcher
        .send(
            &peer,
            Message::OpenChannel {
                pending_channel_id,
                amount,
                csv_delay: FUNDING_CSV_DELAY,
                max_htlcs: FUNDING_MAX_HTLCS,
                funding_key: our_pub,
            },
        )
        .await;
    Ok(())
}

pub async fn handle_open_channel(
    dispatcher: &Dispatcher,
    _peer: &PublicKey,
    msg: Message,
) -> Result<Option<Message>> {
    let Message::OpenChannel {
        pending_channel_id,
        amount,
        csv_delay,
        max_htlcs,
        funding_key,
    } = msg
    else {
        unreachable!("dispatch only routes OpenChannel here")
    };

    let mut map = dispatcher.pending_channels.lock().await;
    if map.contains_key(&pending_channel_id) {
        return Err(Error::DuplicatePendingChannelID(hex::encode(
            pending_channel_id,
        )));
    }
    map.insert(
        pending_channel_id,
        PendingChannel::AwaitingFundingCreated {
            their_pub: funding_key,
            funding_amount: amount,
        },
    );
    drop(map);

    let our_pub = dispatcher.wallet_key.public_key();
    Ok(Some(Message::AcceptChannel {
        pending_channel_id,
        funding_key: our_pub,
        csv_delay,
        max_htlcs,
    }))
}

pub async fn handle_accept_channel(
    dispatcher: &Dispatcher,
    _peer: &PublicKey,
    msg: Message,
) -> Result<Option<Message>> {
    let Message::AcceptChannel {
        pending_channel_id,
        funding_key: their_pub,
        ..
    } = msg
    else {
        unreachable!("dispatch only routes AcceptChannel here")
    };

    let state = dispatcher
        .pending_channels
        .lock()
        .await
        .remove(&pending_channel_id);
    let funding_amount = match state {
        Some(PendingChannel::AwaitingAccept { funding_amount }) => funding_amount,
        _ => {
            return Err(Error::UnknownPendingChannel(hex::encode(
                pending_channel_id,
            )))
        }
    };

    let our_addr = dispatcher.wallet_key.address();
    let their_addr = address_from_pubkey(&their_pub);

    let output = dispatcher
        .store
        .find_spendable_output(our_addr, funding_amount)
        .await?
        .ok_or(Error::InsufficientFunds(funding_amount.low_u128()))?;

    let req = funding_spend_request(output.id, funding_amount, our_addr, their_addr);
    let sig_hash = sig_data(&req)?;
    let our_sig = dispatcher.wallet_key.sign(&sig_hash);
    let channel_id = gen_output_ids(&req)?[0];

    dispatcher.pending_channels.lock().await.insert(
        channel_id,
        PendingChannel::AwaitingFundingSigned {
            their_pub,
            our_addr,
            their_addr,
            funding_amount,
            input_id: output.id,
            our_sig,
        },
    );

    Ok(Some(Message::FundingCreated {
        pending_channel_id,
        input_id: output.id,
        sig: our_sig,
    }))
}

pub async fn handle_funding_created(
    dispatcher: &Dispatcher,
    _peer: &PublicKey,
    msg: Message,
) -> Result<Option<Message>> {
    let Message::FundingCreated {
        pending_channel_id,
        input_id,
        sig,
    } = msg
    else {
        unreachable!("dispatch only routes FundingCreated here")
    };

    let state = dispatcher
        .pending_channels
        .lock()
        .await
        .remove(&pending_channel_id);
    let (their_pub, funding_amount) = match state {
        Some(PendingChannel::AwaitingFundingCreated {
            their_pub,
            funding_amount,
        }) => (their_pub, funding_amount),
        _ => {
            return Err(Error::UnknownPendingChannel(hex::encode(
                pending_channel_id,
            )))
        }
    };

    let our_addr = dispatcher.wallet_key.address();
    let their_addr = address_from_pubkey(&their_pub);
    let req = funding_spend_request(input_id, funding_amount, their_addr, our_addr);
    let sig_hash = sig_data(&req)?;

    if !verify(&sig_hash, &sig, &their_pub) {
        return Err(Error::BadCommitmentSignature);
    }

    let our_sig = dispatcher.wallet_key.sign(&sig_hash);
    let channel_id = gen_output_ids(&req)?[0];

    dispatcher.pending_channels.lock().await.insert(
        channel_id,
        PendingChannel::AwaitingFundingLocked {
            counterparty: their_pub,
            funding_amount,
            sent_locked: false,
        },
    );

    Ok(Some(Message::FundingSigned {
        channel_id,
        sig: our_sig,
    }))
}

/// Validates synchronously, then hands the on-chain submission and the
/// (bounded) confirmation wait to a background task so the dispatcher loop
/// is never blocked on it (§5).
pub async fn handle_funding_signed(dispatcher: &Dispatcher, peer: &PublicKey, msg: Message) {
    let Message::FundingSigned { channel_id, sig } = msg else {
        unreachable!("dispatch only routes FundingSigned here")
    };

    let state = dispatcher.pending_channels.lock().await.remove(&channel_id);
    let (their_pub, our_addr, their_addr, funding_amount, input_id, our_sig) = match state {
        Some(PendingChannel::AwaitingFundingSigned {
            their_pub,
            our_addr,
            their_addr,
            funding_amount,
            input_id,
            our_sig,
        }) => (their_pub, our_addr, their_addr, funding_amount, input_id, our_sig),
        _ => {
            warn!(%peer, "FundingSigned for unknown pending channel");
            return;
        }
    };

    let req = funding_spend_request(input_id, funding_amount, our_addr, their_addr);
    let sig_hash = match sig_data(&req) {
        Ok(h) => h,
        Err(e) => {
            warn!(%peer, error = %e, "failed to reconstruct funding sig-hash");
            return;
        }
    };
    if !verify(&sig_hash, &sig, &their_pub) {
        warn!(%peer, "FundingSigned signature does not recover to counterparty");
        return;
    }

    let dispatcher = dispatcher.clone();
    let peer = *peer;
    tokio::spawn(async move {
        if let Err(e) = finalize_funding(&dispatcher, &peer, channel_id, their_pub, req, our_sig).await {
            warn!(%peer, channel_id = %hex::encode(channel_id), error = %e, "channel funding confirmation failed");
        }
    });
}

async fn finalize_funding(
    dispatcher: &Dispatcher,
    peer: &PublicKey,
    channel_id: [u8; 32],
    their_pub: PublicKey,
    req: SpendRequest,
    our_sig: crate::keys::Signature,
) -> Result<()> {
    let (inputs, outputs) = wire_data(&req, &our_sig)?;
    dispatcher.eth.spend(inputs, outputs).await?;

    let cancel = Arc::new(Notify::new());
    await_output(
        dispatcher.store.as_ref(),
        channel_id,
        cancel,
        FUNDING_CONFIRMATION_TIMEOUT,
    )
    .await?;

    let funding_amount = req.values[0];

    dispatcher
        .store
        .insert_channel(ChannelRow {
            id: channel_id,
            funding_output: channel_id,
            counterparty: their_pub.serialize(),
        })
        .await?;
    dispatcher.open_channels.lock().await.insert(
        channel_id,
        ChannelInfo {
            counterparty: their_pub,
            funding_output_id: channel_id,
            funding_amount,
        },
    );
    dispatcher.pending_channels.lock().await.insert(
        channel_id,
        PendingChannel::AwaitingFundingLocked {
            counterparty: their_pub,
            funding_amount,
            sent_locked: true,
        },
    );

    info!(%peer, channel_id = %hex::encode(channel_id), "funding confirmed on-chain, sending FundingLocked");
    dispatcher.send(peer, Message::FundingLocked { channel_id }).await;
    Ok(())
}

pub async fn handle_funding_locked(dispatcher: &Dispatcher, peer: &PublicKey, msg: Message) {
    let Message::FundingLocked { channel_id } = msg else {
        unreachable!("dispatch only routes FundingLocked here")
    };

    let mut map = dispatcher.pending_channels.lock().await;
    match map.remove(&channel_id) {
        Some(PendingChannel::AwaitingFundingLocked {
            counterparty,
            funding_amount,
            sent_locked,
        }) => {
            drop(map);
            if !sent_locked {
                if let Err(e) = dispatcher
                    .store
                    .insert_channel(ChannelRow {
                        id: channel_id,
                        funding_output: channel_id,
                        counterparty: counterparty.serialize(),
                    })
                    .await
                {
                    warn!(%peer, error = %e, "failed to persist channel on FundingLocked");
                    return;
                }
                dispatcher.open_channels.lock().await.insert(
                    channel_id,
                    ChannelInfo {
                        counterparty,
                        funding_output_id: channel_id,
                        funding_amount,
                    },
                );
                dispatcher
                    .send(peer, Message::FundingLocked { channel_id })
                    .await;
            }
            info!(%peer, channel_id = %hex::encode(channel_id), "channel fully open");
        }
        Some(other) => {
            warn!(%peer, "FundingLocked arrived before local funding confirmation completed");
            map.insert(channel_id, other);
        }
        None => {
            info!(%peer, channel_id = %hex::encode(channel_id), "duplicate FundingLocked, already open");
        }
    }
}
