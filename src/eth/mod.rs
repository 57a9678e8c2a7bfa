//! The on-chain contract surface (§6) and the block/log queries the indexer
//! polls. Grounded in `examples/other_examples/manifests/{radicle-dev-radicle-cli,
//! malda-protocol-malda-zk-coprocessor}`'s use of the `ethers` crate family —
//! the closest pack match for a JSON-RPC-driven account-chain client.

mod contract;

pub use contract::{DrawbridgeContract, DrawbridgeContractEvents, Erc20};

use crate::error::{Error, Result};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Log, U256};
use std::sync::Arc;

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Thin wrapper over the generated contract bindings; owns the chain
/// connection and the wallet used to submit transactions. Fails fast at
/// construction if the embedded ABI or RPC endpoint cannot be used, per the
/// "ABI-parsed-at-init panic" design note (§9) — here surfaced as a
/// propagated startup error instead of an actual panic.
pub struct EthClient {
    provider: Provider<Http>,
    contract: DrawbridgeContract<SignerClient>,
    contract_address: Address,
}

impl EthClient {
    pub async fn new(
        rpc_url: &str,
        contract_address: Address,
        chain_id: u64,
        wallet_private_key: &[u8; 32],
    ) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| Error::OnChainRejected(format!("invalid RPC url: {e}")))?;

        let wallet = LocalWallet::from_bytes(wallet_private_key)
            .map_err(|e| Error::OnChainRejected(format!("invalid wallet key: {e}")))?
            .with_chain_id(chain_id);

        let signer = Arc::new(SignerMiddleware::new(provider.clone(), wallet));
        let contract = DrawbridgeContract::new(contract_address, signer);

        Ok(EthClient {
            provider,
            contract,
            contract_address,
        })
    }

    pub async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .map(|n| n.as_u64())
            .map_err(|e| Error::OnChainRejected(e.to_string()))
    }

    /// Fetches the contract's event log over `(from, to]`, matching the
    /// inclusive-exclusive range the indexer polls (§4.E).
    pub async fn get_logs(&self, from: u64, to: u64) -> Result<Vec<Log>> {
        let filter = ethers::types::Filter::new()
            .address(self.contract_address)
            .from_block(from + 1)
            .to_block(to);
        self.provider
            .get_logs(&filter)
            .await
            .map_err(|e| Error::OnChainRejected(e.to_string()))
    }

    pub async fn token_address(&self) -> Result<Address> {
        self.contract
            .token_address()
            .call()
            .await
            .map_err(|e| Error::OnChainRejected(e.to_string()))
    }

    pub async fn approve(&self, spender: Address, amount: U256) -> Result<()> {
        let token_address = self.token_address().await?;
        let token = Erc20::new(token_address, self.contract.client());
        token
            .approve(spender, amount)
            .send()
            .await
            .map_err(|e| Error::OnChainRejected(e.to_string()))?
            .await
            .map_err(|e| Error::OnChainRejected(e.to_string()))?;
        Ok(())
    }

    pub async fn deposit(&self, tokens: U256) -> Result<()> {
        self.contract
            .deposit(tokens)
            .send()
            .await
            .map_err(|e| Error::OnChainRejected(e.to_string()))?
            .await
            .map_err(|e| Error::OnChainRejected(e.to_string()))?;
        Ok(())
    }

    /// Submits `spend(inputs, outputs)` (§4.A's wire bytes, §6). The caller
    /// is responsible for waiting on the indexer's `await_output` primitive
    /// to learn when the resulting `Create` events land.
    pub async fn spend(&self, inputs: Vec<u8>, outputs: Vec<u8>) -> Result<()> {
        self.contract
            .spend(inputs.into(), outputs.into())
            .send()
            .await
            .map_err(|e| Error::OnChainRejected(e.to_string()))?
            .await
            .map_err(|e| Error::OnChainRejected(e.to_string()))?;
        Ok(())
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }
}
