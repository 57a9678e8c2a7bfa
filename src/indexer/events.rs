//! Parsing of the three contract events the indexer matches on `topic[0]`
//! (§4.E, §6).

use crate::keccak::event_topic;
use ethers::abi::{self, ParamType};
use ethers::types::{Address, Log, U256};

pub fn create_topic() -> [u8; 32] {
    event_topic("Create(uint256,uint256,bytes,bytes32)")
}

pub fn spend_topic() -> [u8; 32] {
    event_topic("Spend(uint256)")
}

pub fn withdrawal_topic() -> [u8; 32] {
    event_topic("Withdrawal(address,uint256)")
}

/// A parsed, block-tagged contract event. Unknown topics never reach this
/// type; the caller logs and skips them (§4.E).
#[derive(Debug, Clone)]
pub enum ChainEvent {
    Create {
        value: U256,
        script: Vec<u8>,
        id: [u8; 32],
        block_number: u64,
        tx_hash: [u8; 32],
    },
    Spend {
        id: [u8; 32],
    },
    Withdrawal {
        owner: Address,
        value: U256,
    },
}

pub fn parse_log(log: &Log) -> Option<ChainEvent> {
    let topic0 = log.topics.first()?.0;
    let block_number = log.block_number?.as_u64();
    let tx_hash = log.transaction_hash?.0;

    if topic0 == create_topic() {
        let tokens = abi::decode(
            &[
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Bytes,
                ParamType::FixedBytes(32),
            ],
            &log.data,
        )
        .ok()?;
        let value = tokens.get(1)?.clone().into_uint()?;
        let script = tokens.get(2)?.clone().into_bytes()?;
        let id: [u8; 32] = tokens.get(3)?.clone().into_fixed_bytes()?.try_into().ok()?;
        Some(ChainEvent::Create {
            value,
            script,
            id,
            block_number,
            tx_hash,
        })
    } else if topic0 == spend_topic() {
        let tokens = abi::decode(&[ParamType::Uint(256)], &log.data).ok()?;
        let id_u256 = tokens.first()?.clone().into_uint()?;
        let mut id = [0u8; 32];
        id_u256.to_big_endian(&mut id);
        Some(ChainEvent::Spend { id })
    } else if topic0 == withdrawal_topic() {
        let tokens = abi::decode(&[ParamType::Address, ParamType::Uint(256)], &log.data).ok()?;
        let owner = tokens.first()?.clone().into_address()?;
        let value = tokens.get(1)?.clone().into_uint()?;
        Some(ChainEvent::Withdrawal { owner, value })
    } else {
        None
    }
}
