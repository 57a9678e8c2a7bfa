use crate::wire::types::Writer;
use ethers::types::{Address, U256};

/// The leading byte of an [`Output`]'s `script` field, and of every output's
/// canonical wire encoding (§3, §4.A).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Payment = 1,
    Multisig = 2,
    CommitmentLocal = 3,
    OfferedHTLC = 4,
}

impl OutputType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(OutputType::Payment),
            2 => Some(OutputType::Multisig),
            3 => Some(OutputType::CommitmentLocal),
            4 => Some(OutputType::OfferedHTLC),
            _ => None,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A spendable output as one of the four variants §3/§4.A defines an
/// encoding for when it is the *new* output of a [`SpendRequest`].
///
/// `CommitmentLocal` appears only as a `script[0]` tag on outputs already in
/// the index (§3's data model); this crate never constructs one as a new
/// spend-request output, since the on-chain dispute flow it belongs to is an
/// explicit Non-goal (§1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputScript {
    Payment {
        recipient: Address,
    },
    /// Redeemable by both addresses jointly. The pair is sorted ascending by
    /// unsigned byte order before construction so `(a, b)` and `(b, a)`
    /// produce the same encoding.
    Multisig {
        alice: Address,
        bob: Address,
    },
    OfferedHTLC {
        delay: U256,
        redemption_address: Address,
        timeout_address: Address,
        payment_hash: [u8; 32],
    },
}

impl OutputScript {
    pub fn multisig(a: Address, b: Address) -> Self {
        let (alice, bob) = if a.as_bytes() <= b.as_bytes() {
            (a, b)
        } else {
            (b, a)
        };
        OutputScript::Multisig { alice, bob }
    }

    pub fn output_type(&self) -> OutputType {
        match self {
            OutputScript::Payment { .. } => OutputType::Payment,
            OutputScript::Multisig { .. } => OutputType::Multisig,
            OutputScript::OfferedHTLC { .. } => OutputType::OfferedHTLC,
        }
    }

    /// Canonical output encoding (§4.A): type byte followed by the
    /// variant-specific fields.
    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.raw(&[self.output_type().as_byte()]);
        match self {
            OutputScript::Payment { recipient } => {
                w.address20(recipient);
            }
            OutputScript::Multisig { alice, bob } => {
                w.address20(alice);
                w.address20(bob);
            }
            OutputScript::OfferedHTLC {
                delay,
                redemption_address,
                timeout_address,
                payment_hash,
            } => {
                let mut delay_buf = [0u8; 32];
                delay.to_big_endian(&mut delay_buf);
                w.bytes32(&delay_buf);
                w.address20(redemption_address);
                w.address20(timeout_address);
                w.bytes32(payment_hash);
            }
        }
        w.into_vec()
    }
}

/// The spend condition attached to the consumed input. §4.A fixes the
/// witness-type byte entering the sig-hash to `0` for both `Payment` and
/// `Multisig`, with no further witness bytes contributing to the hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Witness {
    Payment,
    Multisig,
}

impl Witness {
    pub fn sig_hash_type_byte(self) -> u8 {
        match self {
            Witness::Payment | Witness::Multisig => 0,
        }
    }

    /// The witness bytes carried on the wire alongside the spend signature.
    /// Neither variant carries data beyond the authorizing signature itself.
    pub fn wire_bytes(self) -> Vec<u8> {
        Vec::new()
    }
}

/// `(input_id, witness, [values], [outputs])` (§3). `values.len() ==
/// outputs.len()`; the sum of values need not equal the input's value.
#[derive(Debug, Clone)]
pub struct SpendRequest {
    pub input_id: [u8; 32],
    pub witness: Witness,
    pub values: Vec<U256>,
    pub outputs: Vec<OutputScript>,
}

impl SpendRequest {
    pub fn new(
        input_id: [u8; 32],
        witness: Witness,
        values: Vec<U256>,
        outputs: Vec<OutputScript>,
    ) -> Self {
        SpendRequest {
            input_id,
            witness,
            values,
            outputs,
        }
    }
}
