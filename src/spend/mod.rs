//! Spend engine (§4.E): pure functions over [`SpendRequest`] deriving the
//! keccak-based sig-hash, the on-chain wire bytes, and the output IDs the
//! contract's `Create` events will carry.

mod request;
mod sighash;

pub use request::{OutputScript, OutputType, SpendRequest, Witness};
pub use sighash::{gen_output_ids, sig_data, wire_data};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::WalletKey;
    use ethers::types::{Address, U256};

    fn sample_request() -> SpendRequest {
        SpendRequest::new(
            [0x11; 32],
            Witness::Payment,
            vec![U256::from(1000u64), U256::from(99_000u64)],
            vec![
                OutputScript::Payment {
                    recipient: Address::from_low_u64_be(1),
                },
                OutputScript::Payment {
                    recipient: Address::from_low_u64_be(2),
                },
            ],
        )
    }

    #[test]
    fn sig_data_is_deterministic() {
        let req = sample_request();
        assert_eq!(sig_data(&req).unwrap(), sig_data(&req).unwrap());
    }

    #[test]
    fn multisig_output_ignores_address_order() {
        let a = Address::from_low_u64_be(1);
        let b = Address::from_low_u64_be(2);
        let first = OutputScript::multisig(a, b);
        let second = OutputScript::multisig(b, a);
        assert_eq!(first.encode(), second.encode());
    }

    #[test]
    fn rejects_empty_outputs_before_hashing() {
        let req = SpendRequest::new([0u8; 32], Witness::Payment, vec![], vec![]);
        assert!(sig_data(&req).is_err());
        assert!(gen_output_ids(&req).is_err());
    }

    #[test]
    fn rejects_mismatched_values_and_outputs() {
        let req = SpendRequest::new(
            [0u8; 32],
            Witness::Payment,
            vec![U256::from(1u64), U256::from(2u64)],
            vec![OutputScript::Payment {
                recipient: Address::from_low_u64_be(1),
            }],
        );
        assert!(sig_data(&req).is_err());
    }

    #[test]
    fn gen_output_ids_has_one_id_per_output() {
        let req = sample_request();
        let ids = gen_output_ids(&req).unwrap();
        assert_eq!(ids.len(), req.outputs.len());
        assert_ne!(ids[0], ids[1]);
    }

    #[test]
    fn wire_data_enforces_witness_overflow() {
        let req = sample_request();
        let key = WalletKey::generate();
        let sig = key.sign(&sig_data(&req).unwrap());
        // Both variants carry no witness bytes today, so the happy path
        // never overflows; the guard itself is exercised directly.
        let (inputs, outputs) = wire_data(&req, &sig).unwrap();
        assert_eq!(&inputs[0..32], &req.input_id);
        assert_eq!(&inputs[32..46], &[0u8; 14]);
        assert_eq!(outputs.len(), 2 * (32 + 21));
    }

    #[test]
    fn sign_over_sig_hash_verifies() {
        let req = sample_request();
        let key = WalletKey::generate();
        let digest = sig_data(&req).unwrap();
        let sig = key.sign(&digest);
        assert!(crate::keys::verify(&digest, &sig, &key.public_key()));
    }
}
