use sha3::{Digest, Keccak256};

/// keccak256 of `data`. Used throughout the codec (sig-hash, output IDs) and
/// the key service (Ethereum signed-message prehash).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// keccak256 of an event signature string, e.g. `"Create(uint256,uint256,bytes,bytes32)"`,
/// used to match `topic[0]` of contract logs.
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}
