//! The cross-chain atomic swap state machine (§4.D): the contract chain pays
//! the responder, the Bitcoin Lightning side pays the initiator, and the
//! shared secret (`preimage`/`payment_hash`) ties the two legs together.

use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::keys::{address_from_pubkey, verify, Signature};
use crate::spend::{sig_data, OutputScript, SpendRequest, Witness};
use crate::wire::Message;
use ethers::types::U256;
use secp256k1::PublicKey;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

const OFFERED_HTLC_DELAY: u64 = 5;

/// A swap in flight, owned exclusively by the dispatcher (§5). The
/// initiator's record additionally carries `preimage`; the responder's does
/// not, since it only learns the preimage once the lightning payment
/// succeeds (§4.D).
#[derive(Debug, Clone)]
pub struct PendingSwap {
    pub payment_hash: [u8; 32],
    pub preimage: Option<[u8; 32]>,
    pub eth_channel_id: [u8; 32],
    pub eth_amount: U256,
    pub btc_amount_sat: u64,
    pub counterparty: PublicKey,
    pub commitment_sig: Signature,
}

fn htlc_spend_request(
    eth_channel_id: [u8; 32],
    eth_amount: U256,
    redemption: ethers::types::Address,
    timeout: ethers::types::Address,
    payment_hash: [u8; 32],
) -> SpendRequest {
    SpendRequest::new(
        eth_channel_id,
        Witness::Multisig,
        vec![eth_amount],
        vec![OutputScript::OfferedHTLC {
            delay: U256::from(OFFERED_HTLC_DELAY),
            redemption_address: redemption,
            timeout_address: timeout,
            payment_hash,
        }],
    )
}

/// `InitSwap(peer, eth_amount, btc_amount)` (§4.D, §6).
pub async fn init_swap(
    dispatcher: &Dispatcher,
    peer: PublicKey,
    eth_amount: U256,
    btc_amount_sat: u64,
) -> Result<()> {
    let swap_id: [u8; 32] = rand::random();
    let preimage: [u8; 32] = rand::random();
    let payment_hash: [u8; 32] = Sha256::digest(preimage).into();

    let channel = dispatcher
        .open_channels
        .lock()
        .await
        .iter()
        .find(|(_, info)| info.counterparty == peer && info.funding_amount == eth_amount)
        .map(|(id, info)| (*id, info.clone()));
    let Some((eth_channel_id, _channel)) = channel else {
        return Err(Error::NoSuitableChannel);
    };

    let local_pub = dispatcher.wallet_key.public_key();
    let local_addr = dispatcher.wallet_key.address();
    let counterparty_addr = address_from_pubkey(&peer);

    let req = htlc_spend_request(
        eth_channel_id,
        eth_amount,
        counterparty_addr,
        local_addr,
        payment_hash,
    );
    let sig_hash = sig_data(&req)?;
    let commitment_sig = dispatcher.wallet_key.sign(&sig_hash);

    dispatcher.pending_swaps.lock().await.insert(
        swap_id,
        PendingSwap {
            payment_hash,
            preimage: Some(preimage),
            eth_channel_id,
            eth_amount,
            btc_amount_sat,
            counterparty: peer,
            commitment_sig,
        },
    );

    dispatcher
        .send(
            &peer,
            Message::InitiateSwap {
                swap_id,
                payment_hash,
                eth_channel_id,
                eth_amount,
                eth_commitment_sig: commitment_sig,
                sending_address: local_pub,
                requested_amount: U256::from(btc_amount_sat),
            },
        )
        .await;
    Ok(())
}

pub async fn handle_initiate_swap(
    dispatcher: &Dispatcher,
    peer: &PublicKey,
    msg: Message,
) -> Result<Option<Message>> {
    let Message::InitiateSwap {
        swap_id,
        payment_hash,
        eth_channel_id,
        eth_amount,
        eth_commitment_sig,
        sending_address,
        requested_amount,
    } = msg
    else {
        unreachable!("dispatch only routes InitiateSwap here")
    };

    if dispatcher.pending_swaps.lock().await.contains_key(&swap_id) {
        return Err(Error::DuplicateSwapID(hex::encode(swap_id)));
    }

    let local_addr = dispatcher.wallet_key.address();
    let sending_addr = address_from_pubkey(&sending_address);
    let req = htlc_spend_request(eth_channel_id, eth_amount, local_addr, sending_addr, payment_hash);
    let sig_hash = sig_data(&req)?;
    if !verify(&sig_hash, &eth_commitment_sig, &sending_address) {
        warn!(%peer, swap_id = %hex::encode(swap_id), "swap commitment signature invalid, dropping");
        return Err(Error::BadCommitmentSignature);
    }

    let lnd_identity = match dispatcher.registry.get(peer).await {
        Some(handle) => handle.lnd_identity.lock().await.clone(),
        None => None,
    };
    let Some(lnd_identity) = lnd_identity else {
        return Err(Error::NoLightningChannel);
    };
    let lnd_pubkey_hex = hex::encode(&lnd_identity);
    let channels = dispatcher.lnd.list_channels(&lnd_pubkey_hex).await?;
    if channels.is_empty() {
        return Err(Error::NoLightningChannel);
    }
    let btc_channel_id = channels[0].channel_id;

    dispatcher.pending_swaps.lock().await.insert(
        swap_id,
        PendingSwap {
            payment_hash,
            preimage: None,
            eth_channel_id,
            eth_amount,
            btc_amount_sat: requested_amount.low_u64(),
            counterparty: *peer,
            commitment_sig: eth_commitment_sig,
        },
    );

    Ok(Some(Message::SwapAccepted {
        swap_id,
        btc_channel_id: btc_channel_id.to_string(),
    }))
}

pub async fn handle_swap_accepted(
    dispatcher: &Dispatcher,
    peer: &PublicKey,
    msg: Message,
) -> Result<Option<Message>> {
    let Message::SwapAccepted { swap_id, .. } = msg else {
        unreachable!("dispatch only routes SwapAccepted here")
    };

    let swap = dispatcher
        .pending_swaps
        .lock()
        .await
        .get(&swap_id)
        .cloned()
        .ok_or_else(|| Error::UnknownSwap(hex::encode(swap_id)))?;

    let preimage = swap
        .preimage
        .ok_or_else(|| Error::UnknownSwap(hex::encode(swap_id)))?;

    let payment_request = dispatcher
        .lnd
        .add_invoice(swap.btc_amount_sat as i64, preimage)
        .await?;

    info!(%peer, swap_id = %hex::encode(swap_id), "invoice generated for swap");
    Ok(Some(Message::InvoiceGenerated {
        swap_id,
        payment_request,
    }))
}

pub async fn handle_invoice_generated(
    dispatcher: &Dispatcher,
    peer: &PublicKey,
    msg: Message,
) -> Result<Option<Message>> {
    let Message::InvoiceGenerated {
        swap_id,
        payment_request,
    } = msg
    else {
        unreachable!("dispatch only routes InvoiceGenerated here")
    };

    if !dispatcher.pending_swaps.lock().await.contains_key(&swap_id) {
        return Err(Error::UnknownSwap(hex::encode(swap_id)));
    }

    let swap = dispatcher
        .pending_swaps
        .lock()
        .await
        .get(&swap_id)
        .cloned()
        .ok_or_else(|| Error::UnknownSwap(hex::encode(swap_id)))?;

    let revealed_preimage = dispatcher.lnd.pay_invoice(&payment_request).await?;
    let revealed_hash: [u8; 32] = Sha256::digest(revealed_preimage).into();
    if revealed_hash != swap.payment_hash {
        warn!(swap_id = %hex::encode(swap_id), "lnd returned a preimage not matching the swap's payment hash");
    }

    // The responder now holds the preimage and may claim the on-chain HTLC
    // out-of-band; that claim is not part of this flow.
    info!(%peer, swap_id = %hex::encode(swap_id), "lightning leg paid");
    dispatcher.pending_swaps.lock().await.remove(&swap_id);

    Ok(Some(Message::InvoiceExecuted { swap_id }))
}

pub async fn handle_invoice_executed(dispatcher: &Dispatcher, msg: Message) {
    let Message::InvoiceExecuted { swap_id } = msg else {
        unreachable!("dispatch only routes InvoiceExecuted here")
    };
    dispatcher.pending_swaps.lock().await.remove(&swap_id);
}
