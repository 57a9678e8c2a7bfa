use crate::spend::OutputType;
use bigdecimal::BigDecimal;
use ethers::types::{Address, U256};
use std::str::FromStr;
use std::time::SystemTime;

/// An on-chain output as tracked by the indexer (§3). Once `spent` or
/// `withdrawn` becomes `true` it never transitions back; `id` never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    pub id: [u8; 32],
    pub contract_address: Address,
    pub amount: U256,
    pub block_number: u64,
    pub tx_hash: [u8; 32],
    pub script: Vec<u8>,
    pub spent: bool,
    pub withdrawn: bool,
}

impl Output {
    /// The output type tagged by `script[0]` (§3's invariant that the tag
    /// always matches the decoded type).
    pub fn output_type(&self) -> Option<OutputType> {
        self.script.first().copied().and_then(OutputType::from_byte)
    }
}

/// A finalized channel row (§6's `channels` table). The richer in-memory
/// channel state machine is owned by the dispatcher; only the durable facts
/// survive here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRow {
    pub id: [u8; 32],
    pub funding_output: [u8; 32],
    pub counterparty: [u8; 33],
}

/// The indexer's persisted cursor (§6's `chainsaw_status` table).
#[derive(Debug, Clone, Copy)]
pub struct ChainsawStatus {
    pub last_seen_block: u64,
    pub last_polled_at: SystemTime,
}

/// `amount` and `values` are 256-bit integers on the wire and in the data
/// model; Postgres has no native 256-bit integer type, so the store layer
/// carries them as arbitrary-precision decimals with scale 0.
pub fn u256_to_decimal(v: U256) -> BigDecimal {
    BigDecimal::from_str(&v.to_string()).expect("U256 decimal string always parses")
}

pub fn decimal_to_u256(v: &BigDecimal) -> U256 {
    let (digits, _exponent) = v.with_scale(0).as_bigint_and_exponent();
    U256::from_dec_str(&digits.to_string()).expect("stored amount always fits in U256")
}
