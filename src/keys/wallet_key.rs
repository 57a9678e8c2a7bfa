use crate::error::{Error, Result};
use crate::keccak::keccak256;
use crate::keys::signature::Signature;
use ethers::types::Address;
use rand::rngs::OsRng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

/// A secp256k1 keypair used to sign spend authorizations on the contract
/// chain (§3, §4.B). `sign`/`verify` apply the domain-separated Ethereum
/// signed-message prehash before touching the curve.
#[derive(Clone)]
pub struct WalletKey {
    secret: SecretKey,
}

impl WalletKey {
    pub fn generate() -> Self {
        WalletKey {
            secret: SecretKey::new(&mut OsRng),
        }
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str.trim_start_matches("0x"))
            .map_err(|e| Error::DecodingError(e.to_string()))?;
        let secret =
            SecretKey::from_slice(&bytes).map_err(|e| Error::DecodingError(e.to_string()))?;
        Ok(WalletKey { secret })
    }

    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey::from_secret_key(&secp, &self.secret)
    }

    /// Low-20-bytes of keccak256 of the uncompressed public key, minus its
    /// leading `0x04` tag byte — the standard account-chain address derivation.
    pub fn address(&self) -> Address {
        address_from_pubkey(&self.public_key())
    }

    /// `keccak256("\x19Ethereum Signed Message:\n" || decimal(len(data)) || data)`.
    pub fn prehash(data: &[u8]) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(26 + data.len());
        preimage.extend_from_slice(b"\x19Ethereum Signed Message:\n");
        preimage.extend_from_slice(data.len().to_string().as_bytes());
        preimage.extend_from_slice(data);
        keccak256(&preimage)
    }

    /// Applies the prehash then produces a 65-byte compact-recoverable
    /// signature with `v ∈ {0, 1}`.
    pub fn sign(&self, data: &[u8]) -> Signature {
        let digest = Self::prehash(data);
        let secp = Secp256k1::new();
        let message = Message::from_slice(&digest).expect("32-byte digest");
        let recoverable = secp.sign_ecdsa_recoverable(&message, &self.secret);
        let (recovery_id, compact) = recoverable.serialize_compact();
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&compact);
        out[64] = recovery_id.to_i32() as u8;
        Signature(out)
    }
}

/// Recovers the public key from `(data, sig)` (re-deriving the same prehash
/// `sign` used) and compares it byte-for-byte to `expected_pub`.
pub fn verify(data: &[u8], sig: &Signature, expected_pub: &PublicKey) -> bool {
    recover(data, sig)
        .map(|recovered| recovered == *expected_pub)
        .unwrap_or(false)
}

/// Recovers the public key that produced `sig` over `data`, or `None` if the
/// signature is malformed.
pub fn recover(data: &[u8], sig: &Signature) -> Option<PublicKey> {
    let digest = WalletKey::prehash(data);
    let secp = Secp256k1::new();
    let message = Message::from_slice(&digest).ok()?;
    let recovery_id = RecoveryId::from_i32(sig.v() as i32).ok()?;
    let recoverable = RecoverableSignature::from_compact(sig.r_s(), recovery_id).ok()?;
    secp.recover_ecdsa(&message, &recoverable).ok()
}

impl Signature {
    fn r_s(&self) -> &[u8] {
        &self.0[0..64]
    }
}

pub fn address_from_pubkey(pubkey: &PublicKey) -> Address {
    let uncompressed = pubkey.serialize_uncompressed();
    // Drop the leading 0x04 tag byte before hashing, per account-chain convention.
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_then_verify_round_trips() {
        let key = WalletKey::generate();
        let data = b"sig-hash bytes go here";
        let sig = key.sign(data);
        assert!(verify(data, &sig, &key.public_key()));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let key = WalletKey::generate();
        let other = WalletKey::generate();
        let data = b"some data";
        let sig = key.sign(data);
        assert!(!verify(data, &sig, &other.public_key()));
    }
}
