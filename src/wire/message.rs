use crate::error::{Error, Result};
use crate::keys::Signature;
use crate::wire::types::{Reader, Writer};
use ethers::types::U256;
use secp256k1::PublicKey;
use tokio::io::AsyncRead;

pub const TYPE_INIT: u16 = 16;
pub const TYPE_PING: u16 = 18;
pub const TYPE_PONG: u16 = 19;
pub const TYPE_OPEN_CHANNEL: u16 = 32;
pub const TYPE_ACCEPT_CHANNEL: u16 = 33;
pub const TYPE_FUNDING_CREATED: u16 = 34;
pub const TYPE_FUNDING_SIGNED: u16 = 35;
pub const TYPE_FUNDING_LOCKED: u16 = 36;
pub const TYPE_INITIATE_SWAP: u16 = 900;
pub const TYPE_SWAP_ACCEPTED: u16 = 901;
pub const TYPE_INVOICE_GENERATED: u16 = 902;
pub const TYPE_INVOICE_EXECUTED: u16 = 903;

/// The tagged message family the wire protocol carries (§4.A). Every variant
/// owns its own `encode`/`decode` pair; there is no open-ended virtual
/// message hierarchy (per DESIGN NOTES).
#[derive(Debug, Clone)]
pub enum Message {
    Init {
        lnd_pub: PublicKey,
        lnd_host: String,
    },
    Ping {
        padding: Vec<u8>,
    },
    Pong {
        padding: Vec<u8>,
    },
    OpenChannel {
        pending_channel_id: [u8; 32],
        amount: U256,
        csv_delay: u16,
        max_htlcs: u16,
        funding_key: PublicKey,
    },
    AcceptChannel {
        pending_channel_id: [u8; 32],
        funding_key: PublicKey,
        csv_delay: u16,
        max_htlcs: u16,
    },
    FundingCreated {
        pending_channel_id: [u8; 32],
        input_id: [u8; 32],
        sig: Signature,
    },
    FundingSigned {
        channel_id: [u8; 32],
        sig: Signature,
    },
    FundingLocked {
        channel_id: [u8; 32],
    },
    InitiateSwap {
        swap_id: [u8; 32],
        payment_hash: [u8; 32],
        eth_channel_id: [u8; 32],
        eth_amount: U256,
        eth_commitment_sig: Signature,
        sending_address: PublicKey,
        requested_amount: U256,
    },
    SwapAccepted {
        swap_id: [u8; 32],
        btc_channel_id: String,
    },
    InvoiceGenerated {
        swap_id: [u8; 32],
        payment_request: String,
    },
    InvoiceExecuted {
        swap_id: [u8; 32],
    },
}

impl Message {
    pub fn msg_type(&self) -> u16 {
        match self {
            Message::Init { .. } => TYPE_INIT,
            Message::Ping { .. } => TYPE_PING,
            Message::Pong { .. } => TYPE_PONG,
            Message::OpenChannel { .. } => TYPE_OPEN_CHANNEL,
            Message::AcceptChannel { .. } => TYPE_ACCEPT_CHANNEL,
            Message::FundingCreated { .. } => TYPE_FUNDING_CREATED,
            Message::FundingSigned { .. } => TYPE_FUNDING_SIGNED,
            Message::FundingLocked { .. } => TYPE_FUNDING_LOCKED,
            Message::InitiateSwap { .. } => TYPE_INITIATE_SWAP,
            Message::SwapAccepted { .. } => TYPE_SWAP_ACCEPTED,
            Message::InvoiceGenerated { .. } => TYPE_INVOICE_GENERATED,
            Message::InvoiceExecuted { .. } => TYPE_INVOICE_EXECUTED,
        }
    }

    /// `(msg_type, payload)`.
    pub fn encode(&self) -> (u16, Vec<u8>) {
        let mut w = Writer::new();
        match self {
            Message::Init { lnd_pub, lnd_host } => {
                w.pubkey(lnd_pub);
                w.var_bytes(lnd_host.as_bytes());
            }
            Message::Ping { padding } => {
                w.var_bytes(padding);
            }
            Message::Pong { padding } => {
                w.var_bytes(padding);
            }
            Message::OpenChannel {
                pending_channel_id,
                amount,
                csv_delay,
                max_htlcs,
                funding_key,
            } => {
                w.bytes32(pending_channel_id);
                w.u256(amount);
                w.u16(*csv_delay);
                w.u16(*max_htlcs);
                w.pubkey(funding_key);
            }
            Message::AcceptChannel {
                pending_channel_id,
                funding_key,
                csv_delay,
                max_htlcs,
            } => {
                w.bytes32(pending_channel_id);
                w.pubkey(funding_key);
                w.u16(*csv_delay);
                w.u16(*max_htlcs);
            }
            Message::FundingCreated {
                pending_channel_id,
                input_id,
                sig,
            } => {
                w.bytes32(pending_channel_id);
                w.bytes32(input_id);
                w.var_bytes(sig.as_bytes());
            }
            Message::FundingSigned { channel_id, sig } => {
                w.bytes32(channel_id);
                w.var_bytes(sig.as_bytes());
            }
            Message::FundingLocked { channel_id } => {
                w.bytes32(channel_id);
            }
            Message::InitiateSwap {
                swap_id,
                payment_hash,
                eth_channel_id,
                eth_amount,
                eth_commitment_sig,
                sending_address,
                requested_amount,
            } => {
                w.bytes32(swap_id);
                w.bytes32(payment_hash);
                w.bytes32(eth_channel_id);
                w.u256(eth_amount);
                w.var_bytes(eth_commitment_sig.as_bytes());
                w.pubkey(sending_address);
                w.u256(requested_amount);
            }
            Message::SwapAccepted {
                swap_id,
                btc_channel_id,
            } => {
                w.bytes32(swap_id);
                w.var_bytes(btc_channel_id.as_bytes());
            }
            Message::InvoiceGenerated {
                swap_id,
                payment_request,
            } => {
                w.bytes32(swap_id);
                w.var_bytes(payment_request.as_bytes());
            }
            Message::InvoiceExecuted { swap_id } => {
                w.bytes32(swap_id);
            }
        }
        (self.msg_type(), w.into_vec())
    }

    /// Decodes the payload straight off `r`, given the 16-bit type tag
    /// already read from the frame header.
    pub async fn decode<R: AsyncRead + Unpin>(msg_type: u16, r: &mut R) -> Result<Message> {
        let mut reader = Reader::new(r);
        let msg = match msg_type {
            TYPE_INIT => Message::Init {
                lnd_pub: reader.pubkey().await?,
                lnd_host: decode_utf8(reader.var_bytes().await?)?,
            },
            TYPE_PING => Message::Ping {
                padding: reader.var_bytes().await?,
            },
            TYPE_PONG => Message::Pong {
                padding: reader.var_bytes().await?,
            },
            TYPE_OPEN_CHANNEL => Message::OpenChannel {
                pending_channel_id: reader.bytes32().await?,
                amount: reader.u256().await?,
                csv_delay: reader.u16().await?,
                max_htlcs: reader.u16().await?,
                funding_key: reader.pubkey().await?,
            },
            TYPE_ACCEPT_CHANNEL => Message::AcceptChannel {
                pending_channel_id: reader.bytes32().await?,
                funding_key: reader.pubkey().await?,
                csv_delay: reader.u16().await?,
                max_htlcs: reader.u16().await?,
            },
            TYPE_FUNDING_CREATED => Message::FundingCreated {
                pending_channel_id: reader.bytes32().await?,
                input_id: reader.bytes32().await?,
                sig: Signature::from_slice(&reader.var_bytes().await?)?,
            },
            TYPE_FUNDING_SIGNED => Message::FundingSigned {
                channel_id: reader.bytes32().await?,
                sig: Signature::from_slice(&reader.var_bytes().await?)?,
            },
            TYPE_FUNDING_LOCKED => Message::FundingLocked {
                channel_id: reader.bytes32().await?,
            },
            TYPE_INITIATE_SWAP => Message::InitiateSwap {
                swap_id: reader.bytes32().await?,
                payment_hash: reader.bytes32().await?,
                eth_channel_id: reader.bytes32().await?,
                eth_amount: reader.u256().await?,
                eth_commitment_sig: Signature::from_slice(&reader.var_bytes().await?)?,
                sending_address: reader.pubkey().await?,
                requested_amount: reader.u256().await?,
            },
            TYPE_SWAP_ACCEPTED => Message::SwapAccepted {
                swap_id: reader.bytes32().await?,
                btc_channel_id: decode_utf8(reader.var_bytes().await?)?,
            },
            TYPE_INVOICE_GENERATED => Message::InvoiceGenerated {
                swap_id: reader.bytes32().await?,
                payment_request: decode_utf8(reader.var_bytes().await?)?,
            },
            TYPE_INVOICE_EXECUTED => Message::InvoiceExecuted {
                swap_id: reader.bytes32().await?,
            },
            other => return Err(Error::UnknownMessage(other)),
        };
        Ok(msg)
    }
}

fn decode_utf8(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Error::DecodingError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    async fn round_trip(msg: Message) {
        let (msg_type, payload) = msg.encode();
        let mut cursor = Cursor::new(payload);
        let decoded = Message::decode(msg_type, &mut cursor).await.unwrap();
        assert_eq!(decoded.encode().1, msg.encode().1);
    }

    #[tokio::test]
    async fn round_trips_every_variant() {
        let key = PublicKey::from_secret_key(
            &secp256k1::Secp256k1::new(),
            &secp256k1::SecretKey::from_slice(&[7u8; 32]).unwrap(),
        );
        let sig = Signature::from_slice(&[9u8; 65]).unwrap();

        round_trip(Message::Init {
            lnd_pub: key,
            lnd_host: "10.0.0.1:9735".into(),
        })
        .await;
        round_trip(Message::Ping {
            padding: vec![0u8; 16],
        })
        .await;
        round_trip(Message::Pong {
            padding: vec![0u8; 16],
        })
        .await;
        round_trip(Message::OpenChannel {
            pending_channel_id: [1u8; 32],
            amount: U256::from(100_000u64),
            csv_delay: 7,
            max_htlcs: 2,
            funding_key: key,
        })
        .await;
        round_trip(Message::AcceptChannel {
            pending_channel_id: [1u8; 32],
            funding_key: key,
            csv_delay: 7,
            max_htlcs: 2,
        })
        .await;
        round_trip(Message::FundingCreated {
            pending_channel_id: [1u8; 32],
            input_id: [2u8; 32],
            sig,
        })
        .await;
        round_trip(Message::FundingSigned {
            channel_id: [3u8; 32],
            sig,
        })
        .await;
        round_trip(Message::FundingLocked {
            channel_id: [3u8; 32],
        })
        .await;
        round_trip(Message::InitiateSwap {
            swap_id: [4u8; 32],
            payment_hash: [5u8; 32],
            eth_channel_id: [3u8; 32],
            eth_amount: U256::from(100_000u64),
            eth_commitment_sig: sig,
            sending_address: key,
            requested_amount: U256::from(50_000u64),
        })
        .await;
        round_trip(Message::SwapAccepted {
            swap_id: [4u8; 32],
            btc_channel_id: "123x456x0".into(),
        })
        .await;
        round_trip(Message::InvoiceGenerated {
            swap_id: [4u8; 32],
            payment_request: "lnbc1...".into(),
        })
        .await;
        round_trip(Message::InvoiceExecuted {
            swap_id: [4u8; 32],
        })
        .await;
    }

    #[tokio::test]
    async fn unknown_type_is_reported() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        let err = Message::decode(1, &mut cursor).await.unwrap_err();
        assert!(matches!(err, Error::UnknownMessage(1)));
    }
}
