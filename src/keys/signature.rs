use crate::error::{Error, Result};

/// A 65-byte compact-recoverable ECDSA signature: `r (32) || s (32) || v (1)`
/// with `v ∈ {0, 1}`, as appended by the signer — not the `{27, 28}`
/// convention some wallets use.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 65]);

impl Signature {
    pub fn from_slice(b: &[u8]) -> Result<Self> {
        if b.len() != 65 {
            return Err(Error::DecodingError(format!(
                "signature must be 65 bytes, got {}",
                b.len()
            )));
        }
        let mut buf = [0u8; 65];
        buf.copy_from_slice(b);
        Ok(Signature(buf))
    }

    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }

    pub fn r(&self) -> &[u8] {
        &self.0[0..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.0[32..64]
    }

    pub fn v(&self) -> u8 {
        self.0[64]
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}
