use crate::error::{Error, Result};
use crate::wire::message::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Every message on the wire is preceded by this 2-byte magic.
pub const MAGIC: u16 = 0xBEEF;

/// Reads one framed message: 2-byte magic, 2-byte big-endian type, then the
/// self-delimiting payload understood by the matching [`Message`] variant.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<Message> {
    let mut header = [0u8; 4];
    r.read_exact(&mut header)
        .await
        .map_err(|_| Error::TransportClosed)?;
    let magic = u16::from_be_bytes([header[0], header[1]]);
    if magic != MAGIC {
        return Err(Error::DecodingError(format!("bad magic {magic:#06x}")));
    }
    let msg_type = u16::from_be_bytes([header[2], header[3]]);
    Message::decode(msg_type, r).await
}

/// Writes one framed message.
pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, msg: &Message) -> Result<()> {
    let (msg_type, payload) = msg.encode();
    let mut out = Vec::with_capacity(4 + payload.len());
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&msg_type.to_be_bytes());
    out.extend_from_slice(&payload);
    w.write_all(&out).await.map_err(|_| Error::TransportClosed)?;
    w.flush().await.map_err(|_| Error::TransportClosed)?;
    Ok(())
}
