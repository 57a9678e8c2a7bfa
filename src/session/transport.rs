//! Noise-XK framed transport (§4.C). Every handshake message and every
//! post-handshake transport message is preceded by a 2-byte big-endian
//! length, the conventional Noise socket framing; the decrypted plaintext of
//! a transport message is itself one [`Message`] frame (§4.A).

use crate::error::{Error, Result};
use crate::keys::NodeKey;
use crate::wire::{read_frame, write_frame, Message};
use secp256k1::PublicKey;
use snow::{Builder, TransportState};
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const NOISE_PATTERN: &str = "Noise_XK_secp256k1_ChaChaPoly_SHA256";
/// Noise caps a single transport message at 65535 bytes including the 16-byte
/// authentication tag; wire messages in this protocol are always far smaller.
const MAX_NOISE_MESSAGE: usize = 65535;

pub struct SecureChannel {
    stream: TcpStream,
    transport: TransportState,
    pub remote_static: PublicKey,
}

impl SecureChannel {
    /// Runs the Noise-XK handshake as the dialing side, authenticating the
    /// remote's expected static key.
    pub async fn handshake_outbound(
        mut stream: TcpStream,
        local: &NodeKey,
        expected_remote: PublicKey,
    ) -> Result<Self> {
        let builder = Builder::new(
            NOISE_PATTERN
                .parse()
                .map_err(|_| Error::DecodingError("invalid noise pattern".into()))?,
        );
        let mut handshake = builder
            .local_private_key(&local.secret_bytes())
            .remote_public_key(&expected_remote.serialize())
            .build_initiator()
            .map_err(|e| Error::DecodingError(e.to_string()))?;

        let mut buf = vec![0u8; MAX_NOISE_MESSAGE];

        // -> e
        let len = handshake
            .write_message(&[], &mut buf)
            .map_err(|e| Error::DecodingError(e.to_string()))?;
        write_noise_frame(&mut stream, &buf[..len]).await?;

        // <- e, ee, s, es
        let msg = read_noise_frame(&mut stream).await?;
        let mut payload = vec![0u8; MAX_NOISE_MESSAGE];
        handshake
            .read_message(&msg, &mut payload)
            .map_err(|e| Error::DecodingError(e.to_string()))?;

        // -> s, se
        let len = handshake
            .write_message(&[], &mut buf)
            .map_err(|e| Error::DecodingError(e.to_string()))?;
        write_noise_frame(&mut stream, &buf[..len]).await?;

        let transport = handshake
            .into_transport_mode()
            .map_err(|e| Error::DecodingError(e.to_string()))?;

        Ok(SecureChannel {
            stream,
            transport,
            remote_static: expected_remote,
        })
    }

    /// Runs the Noise-XK handshake as the listening side and returns the
    /// remote's static public key as its identity (§4.C).
    pub async fn handshake_inbound(mut stream: TcpStream, local: &NodeKey) -> Result<Self> {
        let builder = Builder::new(
            NOISE_PATTERN
                .parse()
                .map_err(|_| Error::DecodingError("invalid noise pattern".into()))?,
        );
        let mut handshake = builder
            .local_private_key(&local.secret_bytes())
            .build_responder()
            .map_err(|e| Error::DecodingError(e.to_string()))?;

        let mut buf = vec![0u8; MAX_NOISE_MESSAGE];

        // <- e
        let msg = read_noise_frame(&mut stream).await?;
        let mut payload = vec![0u8; MAX_NOISE_MESSAGE];
        handshake
            .read_message(&msg, &mut payload)
            .map_err(|e| Error::DecodingError(e.to_string()))?;

        // -> e, ee, s, es
        let len = handshake
            .write_message(&[], &mut buf)
            .map_err(|e| Error::DecodingError(e.to_string()))?;
        write_noise_frame(&mut stream, &buf[..len]).await?;

        // <- s, se
        let msg = read_noise_frame(&mut stream).await?;
        handshake
            .read_message(&msg, &mut payload)
            .map_err(|e| Error::DecodingError(e.to_string()))?;

        let remote_static_bytes = handshake
            .get_remote_static()
            .ok_or_else(|| Error::DecodingError("handshake produced no remote static key".into()))?
            .to_vec();
        let remote_static = PublicKey::from_slice(&remote_static_bytes)
            .map_err(|e| Error::DecodingError(e.to_string()))?;

        let transport = handshake
            .into_transport_mode()
            .map_err(|e| Error::DecodingError(e.to_string()))?;

        Ok(SecureChannel {
            stream,
            transport,
            remote_static,
        })
    }

    pub async fn send(&mut self, msg: &Message) -> Result<()> {
        let (msg_type, payload) = msg.encode();
        let mut plaintext = Vec::with_capacity(4 + payload.len());
        plaintext.extend_from_slice(&crate::wire::MAGIC.to_be_bytes());
        plaintext.extend_from_slice(&msg_type.to_be_bytes());
        plaintext.extend_from_slice(&payload);

        let mut ciphertext = vec![0u8; plaintext.len() + 16];
        let len = self
            .transport
            .write_message(&plaintext, &mut ciphertext)
            .map_err(|e| Error::DecodingError(e.to_string()))?;
        write_noise_frame(&mut self.stream, &ciphertext[..len]).await
    }

    pub async fn recv(&mut self) -> Result<Message> {
        let ciphertext = read_noise_frame(&mut self.stream).await?;
        let mut plaintext = vec![0u8; ciphertext.len()];
        let len = self
            .transport
            .read_message(&ciphertext, &mut plaintext)
            .map_err(|e| Error::DecodingError(e.to_string()))?;
        let mut cursor = Cursor::new(plaintext[..len].to_vec());
        read_frame(&mut cursor).await
    }

    /// Splits into owned halves so the reader and writer loops can each own
    /// one without sharing a mutex across I/O (§5, §9).
    pub fn into_split(self) -> (SecureChannelReader, SecureChannelWriter) {
        let (read_half, write_half) = self.stream.into_split();
        let transport = std::sync::Arc::new(tokio::sync::Mutex::new(self.transport));
        (
            SecureChannelReader {
                stream: read_half,
                transport: transport.clone(),
            },
            SecureChannelWriter {
                stream: write_half,
                transport,
            },
        )
    }
}

pub struct SecureChannelReader {
    stream: tokio::net::tcp::OwnedReadHalf,
    transport: std::sync::Arc<tokio::sync::Mutex<TransportState>>,
}

pub struct SecureChannelWriter {
    stream: tokio::net::tcp::OwnedWriteHalf,
    transport: std::sync::Arc<tokio::sync::Mutex<TransportState>>,
}

impl SecureChannelReader {
    pub async fn recv(&mut self) -> Result<Message> {
        let ciphertext = read_noise_frame(&mut self.stream).await?;
        let mut plaintext = vec![0u8; ciphertext.len()];
        let len = {
            let mut transport = self.transport.lock().await;
            transport
                .read_message(&ciphertext, &mut plaintext)
                .map_err(|e| Error::DecodingError(e.to_string()))?
        };
        let mut cursor = Cursor::new(plaintext[..len].to_vec());
        read_frame(&mut cursor).await
    }
}

impl SecureChannelWriter {
    pub async fn send(&mut self, msg: &Message) -> Result<()> {
        let (msg_type, payload) = msg.encode();
        let mut plaintext = Vec::with_capacity(4 + payload.len());
        plaintext.extend_from_slice(&crate::wire::MAGIC.to_be_bytes());
        plaintext.extend_from_slice(&msg_type.to_be_bytes());
        plaintext.extend_from_slice(&payload);

        let mut ciphertext = vec![0u8; plaintext.len() + 16];
        let len = {
            let mut transport = self.transport.lock().await;
            transport
                .write_message(&plaintext, &mut ciphertext)
                .map_err(|e| Error::DecodingError(e.to_string()))?
        };
        write_noise_frame(&mut self.stream, &ciphertext[..len]).await
    }
}

async fn write_noise_frame<W: tokio::io::AsyncWrite + Unpin>(w: &mut W, data: &[u8]) -> Result<()> {
    let len = data.len() as u16;
    w.write_all(&len.to_be_bytes())
        .await
        .map_err(|_| Error::TransportClosed)?;
    w.write_all(data).await.map_err(|_| Error::TransportClosed)?;
    w.flush().await.map_err(|_| Error::TransportClosed)
}

async fn read_noise_frame<R: tokio::io::AsyncRead + Unpin>(r: &mut R) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    r.read_exact(&mut len_buf)
        .await
        .map_err(|_| Error::TransportClosed)?;
    let len = u16::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)
        .await
        .map_err(|_| Error::TransportClosed)?;
    Ok(buf)
}
