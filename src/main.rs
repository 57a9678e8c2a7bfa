mod logger;

use anyhow::{Context, Result};
use drawbridge_node::config::Config;
use drawbridge_node::dispatcher::Dispatcher;
use drawbridge_node::eth::EthClient;
use drawbridge_node::indexer;
use drawbridge_node::keys::{NodeKey, WalletKey};
use drawbridge_node::lnd::{GrpcLndClient, LndClient};
use drawbridge_node::session::{ConnectionManager, PeerRegistry};
use drawbridge_node::store::{PgStore, Store};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::metadata::LevelFilter;

const INBOUND_QUEUE_DEPTH: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("loading configuration")?;
    logger::init_tracing(LevelFilter::INFO, config.json_logs)?;

    let node_key = NodeKey::from_hex(&hex::encode(config.identity_private_key))
        .context("deriving node identity key")?;
    let wallet_key =
        WalletKey::from_hex(&hex::encode(config.private_key)).context("deriving wallet key")?;

    tracing::info!(
        node_pub = %hex::encode(node_key.public_key_bytes()),
        wallet_address = %wallet_key.address(),
        "starting node"
    );

    let listen_addr = SocketAddr::new(config.p2p_ip, config.p2p_port);
    let listener = ConnectionManager::bind(listen_addr)
        .await
        .with_context(|| format!("binding listen address {listen_addr}"))?;

    let eth = Arc::new(
        EthClient::new(
            &config.eth_rpc_url,
            config.contract_address,
            config.chain_id,
            &config.private_key,
        )
        .await
        .context("constructing on-chain client")?,
    );

    let lnd_cert = std::fs::read(&config.lnd_cert_file).context("reading lnd TLS certificate")?;
    let macaroon_hex = hex::encode(
        std::fs::read(&config.lnd_macaroon_file).context("reading lnd macaroon")?,
    );
    let lnd: Arc<dyn LndClient> = Arc::new(
        GrpcLndClient::connect(&config.lnd_host, config.lnd_port, &lnd_cert, macaroon_hex)
            .await
            .context("connecting to lightning-daemon")?,
    );

    let store: Arc<dyn Store> = Arc::new(
        PgStore::connect(&config.database_url)
            .await
            .context("connecting to persistence")?,
    );

    let registry = PeerRegistry::new();
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);

    let connection_manager = ConnectionManager::new(node_key, registry.clone(), inbound_tx);
    connection_manager.spawn_accept_loop(listener);
    connection_manager
        .dial_bootstrap_peers(config.bootstrap_peers)
        .await;

    tokio::spawn(indexer::run(
        eth.clone(),
        store.clone(),
        config.confirmation_count,
    ));

    let dispatcher = Dispatcher::new(wallet_key, registry, store, eth, lnd);
    dispatcher.run(inbound_rx).await;

    Ok(())
}
