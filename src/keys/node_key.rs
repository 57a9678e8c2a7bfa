use crate::error::{Error, Result};
use rand::rngs::OsRng;
use secp256k1::{PublicKey, Secp256k1, SecretKey};

/// A secp256k1 keypair used to authenticate the Noise transport (§3). Kept
/// separate from [`crate::keys::WalletKey`] because a node's transport
/// identity and its on-chain signing identity need not coincide.
#[derive(Clone)]
pub struct NodeKey {
    secret: SecretKey,
}

impl NodeKey {
    pub fn generate() -> Self {
        let secret = SecretKey::new(&mut OsRng);
        NodeKey { secret }
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| Error::DecodingError(e.to_string()))?;
        let secret =
            SecretKey::from_slice(&bytes).map_err(|e| Error::DecodingError(e.to_string()))?;
        Ok(NodeKey { secret })
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.secret_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &self.secret)
    }

    /// 33-byte SEC1 compressed form, the identity used as the peer registry key.
    pub fn public_key_bytes(&self) -> [u8; 33] {
        self.public_key().serialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_hex() {
        let key = NodeKey::generate();
        let hex_str = hex::encode(key.secret_bytes());
        let reloaded = NodeKey::from_hex(&hex_str).unwrap();
        assert_eq!(key.public_key_bytes(), reloaded.public_key_bytes());
    }
}
