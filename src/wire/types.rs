use crate::error::{Error, Result};
use ethers::types::{Address, U256};
use secp256k1::PublicKey;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads one message's self-delimiting payload straight off the transport.
/// Every helper reads exactly the bytes it needs and nothing more, which is
/// what lets a payload omit an overall length prefix (§4.A).
pub struct Reader<'a, R> {
    inner: &'a mut R,
}

impl<'a, R: AsyncRead + Unpin> Reader<'a, R> {
    pub fn new(inner: &'a mut R) -> Self {
        Reader { inner }
    }

    async fn take(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.inner
            .read_exact(&mut buf)
            .await
            .map_err(|_| Error::TransportClosed)?;
        Ok(buf)
    }

    pub async fn u16(&mut self) -> Result<u16> {
        let b = self.take(2).await?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub async fn u64(&mut self) -> Result<u64> {
        let b = self.take(8).await?;
        Ok(u64::from_be_bytes(b.try_into().unwrap()))
    }

    pub async fn bytes32(&mut self) -> Result<[u8; 32]> {
        let b = self.take(32).await?;
        Ok(b.try_into().unwrap())
    }

    pub async fn address20(&mut self) -> Result<Address> {
        let b = self.take(20).await?;
        Ok(Address::from_slice(&b))
    }

    pub async fn u256(&mut self) -> Result<U256> {
        let b = self.take(32).await?;
        Ok(U256::from_big_endian(&b))
    }

    pub async fn var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.u16().await? as usize;
        self.take(len).await
    }

    pub async fn pubkey(&mut self) -> Result<PublicKey> {
        let b = self.take(33).await?;
        PublicKey::from_slice(&b).map_err(|e| Error::DecodingError(e.to_string()))
    }

    pub async fn net_addr(&mut self) -> Result<SocketAddr> {
        let tag = self.take(1).await?[0];
        let ip = match tag {
            1 => {
                let b = self.take(4).await?;
                IpAddr::V4(Ipv4Addr::new(b[0], b[1], b[2], b[3]))
            }
            2 => {
                let b = self.take(16).await?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&b);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            other => return Err(Error::DecodingError(format!("unknown address tag {other}"))),
        };
        let port = self.u16().await?;
        Ok(SocketAddr::new(ip, port))
    }
}

/// Append-only byte writer matching `Reader`'s wire encoding.
#[derive(Default)]
pub struct Writer(Vec<u8>);

impl Writer {
    pub fn new() -> Self {
        Writer(Vec::new())
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.0.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub fn bytes32(&mut self, v: &[u8; 32]) -> &mut Self {
        self.0.extend_from_slice(v);
        self
    }

    pub fn address20(&mut self, v: &Address) -> &mut Self {
        self.0.extend_from_slice(v.as_bytes());
        self
    }

    pub fn u256(&mut self, v: &U256) -> &mut Self {
        let mut buf = [0u8; 32];
        v.to_big_endian(&mut buf);
        self.0.extend_from_slice(&buf);
        self
    }

    pub fn var_bytes(&mut self, v: &[u8]) -> &mut Self {
        self.u16(v.len() as u16);
        self.0.extend_from_slice(v);
        self
    }

    pub fn pubkey(&mut self, v: &PublicKey) -> &mut Self {
        self.0.extend_from_slice(&v.serialize());
        self
    }

    pub fn net_addr(&mut self, v: &SocketAddr) -> &mut Self {
        match v {
            SocketAddr::V4(a) => {
                self.0.push(1);
                self.0.extend_from_slice(&a.ip().octets());
            }
            SocketAddr::V6(a) => {
                self.0.push(2);
                self.0.extend_from_slice(&a.ip().octets());
            }
        }
        self.u16(v.port());
        self
    }

    pub fn raw(&mut self, v: &[u8]) -> &mut Self {
        self.0.extend_from_slice(v);
        self
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}
