//! Configuration loading (§6's enumerated options). CLI flags via `clap`
//! take precedence over a `--config` TOML file, which takes precedence over
//! each field's default; grounded in the coordinator binary's `cli.rs`.
//! Unlike the teacher, a malformed config is one of only three fatal
//! start-up conditions (§7), so this module surfaces a single `Result`
//! rather than `expect`-ing its way through.

use crate::error::{Error, Result};
use crate::session::BootstrapPeer;
use clap::Parser;
use secp256k1::PublicKey;
use serde::Deserialize;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "drawbridge-node")]
pub struct Opts {
    /// Optional TOML file overlaying these defaults before CLI flags apply.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, env = "DRAWBRIDGE_ETH_RPC_URL")]
    eth_rpc_url: Option<String>,

    #[arg(long, env = "DRAWBRIDGE_CONTRACT_ADDRESS")]
    contract_address: Option<String>,

    #[arg(long, env = "DRAWBRIDGE_CHAIN_ID")]
    chain_id: Option<u64>,

    /// 32-byte wallet key, hex-encoded.
    #[arg(long, env = "DRAWBRIDGE_PRIVATE_KEY")]
    private_key: Option<String>,

    /// 32-byte node identity key, hex-encoded.
    #[arg(long, env = "DRAWBRIDGE_IDENTITY_PRIVATE_KEY")]
    identity_private_key: Option<String>,

    #[arg(long, default_value = "0.0.0.0")]
    p2p_ip: IpAddr,

    #[arg(long, default_value_t = 9735)]
    p2p_port: u16,

    /// `host:port|pubkey-hex` entries to dial at startup.
    #[arg(long = "bootstrap-peer")]
    bootstrap_peers: Vec<String>,

    #[arg(long, env = "DRAWBRIDGE_LND_HOST")]
    lnd_host: Option<String>,

    #[arg(long, default_value_t = 10009)]
    lnd_port: u16,

    #[arg(long)]
    lnd_cert_file: Option<PathBuf>,

    #[arg(long)]
    lnd_macaroon_file: Option<PathBuf>,

    #[arg(long, env = "DRAWBRIDGE_DATABASE_URL")]
    database_url: Option<String>,

    #[arg(long, default_value_t = 0)]
    confirmation_count: u64,

    /// Emit logs as JSON instead of the human-readable default.
    #[arg(long)]
    pub json_logs: bool,
}

/// The overlay file's shape; every field optional so a partial file only
/// fills in the flags the caller chooses not to pass on the command line.
#[derive(Debug, Deserialize, Default)]
struct FileOverlay {
    eth_rpc_url: Option<String>,
    contract_address: Option<String>,
    chain_id: Option<u64>,
    private_key: Option<String>,
    identity_private_key: Option<String>,
    p2p_ip: Option<IpAddr>,
    p2p_port: Option<u16>,
    bootstrap_peers: Option<Vec<String>>,
    lnd_host: Option<String>,
    lnd_port: Option<u16>,
    lnd_cert_file: Option<PathBuf>,
    lnd_macaroon_file: Option<PathBuf>,
    database_url: Option<String>,
    confirmation_count: Option<u64>,
}

/// The fully resolved, validated configuration (§6).
#[derive(Debug, Clone)]
pub struct Config {
    pub eth_rpc_url: String,
    pub contract_address: ethers::types::Address,
    pub chain_id: u64,
    pub private_key: [u8; 32],
    pub identity_private_key: [u8; 32],
    pub p2p_ip: IpAddr,
    pub p2p_port: u16,
    pub bootstrap_peers: Vec<BootstrapPeer>,
    pub lnd_host: String,
    pub lnd_port: u16,
    pub lnd_cert_file: PathBuf,
    pub lnd_macaroon_file: PathBuf,
    pub database_url: String,
    pub confirmation_count: u64,
    pub json_logs: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        let opts = Opts::parse();
        Self::from_opts(opts)
    }

    fn from_opts(opts: Opts) -> Result<Self> {
        let overlay = match &opts.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| Error::DecodingError(format!("reading config file: {e}")))?;
                toml::from_str(&text)
                    .map_err(|e| Error::DecodingError(format!("parsing config file: {e}")))?
            }
            None => FileOverlay::default(),
        };

        let eth_rpc_url = require("eth-rpc-url", opts.eth_rpc_url.or(overlay.eth_rpc_url))?;
        let contract_address_hex = require(
            "contract-address",
            opts.contract_address.or(overlay.contract_address),
        )?;
        let contract_address = ethers::types::Address::from_str(contract_address_hex.trim_start_matches("0x"))
            .map_err(|e| Error::DecodingError(format!("invalid contract-address: {e}")))?;

        let chain_id = require_copy("chain-id", opts.chain_id.or(overlay.chain_id))?;

        let private_key = parse_key(require(
            "private-key",
            opts.private_key.or(overlay.private_key),
        )?)?;
        let identity_private_key = parse_key(require(
            "identity-private-key",
            opts.identity_private_key.or(overlay.identity_private_key),
        )?)?;

        let p2p_ip = if opts.p2p_ip.is_unspecified() {
            overlay.p2p_ip.unwrap_or(opts.p2p_ip)
        } else {
            opts.p2p_ip
        };
        let p2p_port = overlay.p2p_port.unwrap_or(opts.p2p_port);

        let raw_peers = if !opts.bootstrap_peers.is_empty() {
            opts.bootstrap_peers
        } else {
            overlay.bootstrap_peers.unwrap_or_default()
        };
        let bootstrap_peers = raw_peers
            .iter()
            .map(|s| parse_bootstrap_peer(s))
            .collect::<Result<Vec<_>>>()?;

        let lnd_host = require("lnd-host", opts.lnd_host.or(overlay.lnd_host))?;
        let lnd_port = overlay.lnd_port.unwrap_or(opts.lnd_port);
        let lnd_cert_file = opts
            .lnd_cert_file
            .or(overlay.lnd_cert_file)
            .ok_or_else(|| missing("lnd-cert-file"))?;
        let lnd_macaroon_file = opts
            .lnd_macaroon_file
            .or(overlay.lnd_macaroon_file)
            .ok_or_else(|| missing("lnd-macaroon-file"))?;

        let database_url = require("database-url", opts.database_url.or(overlay.database_url))?;
        let confirmation_count = overlay.confirmation_count.unwrap_or(opts.confirmation_count);

        Ok(Config {
            eth_rpc_url,
            contract_address,
            chain_id,
            private_key,
            identity_private_key,
            p2p_ip,
            p2p_port,
            bootstrap_peers,
            lnd_host,
            lnd_port,
            lnd_cert_file,
            lnd_macaroon_file,
            database_url,
            confirmation_count,
            json_logs: opts.json_logs,
        })
    }
}

fn missing(option: &str) -> Error {
    Error::DecodingError(format!("missing required configuration option `{option}`"))
}

fn require(option: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| missing(option))
}

fn require_copy<T>(option: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| missing(option))
}

fn parse_key(hex_str: String) -> Result<[u8; 32]> {
    let bytes = hex::decode(hex_str.trim_start_matches("0x"))
        .map_err(|e| Error::DecodingError(format!("invalid hex key: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| Error::DecodingError("key must be exactly 32 bytes".into()))
}

fn parse_bootstrap_peer(s: &str) -> Result<BootstrapPeer> {
    let (addr, pubkey_hex) = s
        .split_once('|')
        .ok_or_else(|| Error::DecodingError(format!("bootstrap peer `{s}` missing `|pubkey`")))?;
    let address = std::net::SocketAddr::from_str(addr)
        .map_err(|e| Error::DecodingError(format!("invalid bootstrap peer address: {e}")))?;
    let pubkey_bytes = hex::decode(pubkey_hex)
        .map_err(|e| Error::DecodingError(format!("invalid bootstrap peer pubkey: {e}")))?;
    let pubkey = PublicKey::from_slice(&pubkey_bytes)
        .map_err(|e| Error::DecodingError(format!("invalid bootstrap peer pubkey: {e}")))?;
    Ok(BootstrapPeer { address, pubkey })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Vec<String> {
        [
            "drawbridge-node",
            "--eth-rpc-url",
            "http://localhost:8545",
            "--contract-address",
            "0x1111111111111111111111111111111111111111",
            "--chain-id",
            "1337",
            "--private-key",
            &"11".repeat(32),
            "--identity-private-key",
            &"22".repeat(32),
            "--lnd-host",
            "127.0.0.1",
            "--lnd-cert-file",
            "/tmp/tls.cert",
            "--lnd-macaroon-file",
            "/tmp/admin.macaroon",
            "--database-url",
            "postgres://localhost/drawbridge",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn cli_flags_resolve_to_config() {
        let opts = Opts::parse_from(base_args());
        let config = Config::from_opts(opts).unwrap();
        assert_eq!(config.eth_rpc_url, "http://localhost:8545");
        assert_eq!(config.chain_id, 1337);
        assert_eq!(config.p2p_port, 9735);
        assert_eq!(config.lnd_port, 10009);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let mut args = base_args();
        let idx = args.iter().position(|a| *a == "--eth-rpc-url").unwrap();
        args.drain(idx..idx + 2);
        let opts = Opts::parse_from(args);
        let err = Config::from_opts(opts).unwrap_err();
        assert!(matches!(err, Error::DecodingError(_)));
    }

    #[test]
    fn bootstrap_peer_parses_address_and_pubkey() {
        let secp = secp256k1::Secp256k1::new();
        let pubkey = PublicKey::from_secret_key(
            &secp,
            &secp256k1::SecretKey::from_slice(&[5u8; 32]).unwrap(),
        );
        let entry = format!("127.0.0.1:9735|{}", hex::encode(pubkey.serialize()));
        let peer = parse_bootstrap_peer(&entry).unwrap();
        assert_eq!(peer.address.port(), 9735);
        assert_eq!(peer.pubkey, pubkey);
    }

    #[test]
    fn bootstrap_peer_without_pubkey_separator_is_rejected() {
        assert!(parse_bootstrap_peer("127.0.0.1:9735").is_err());
    }
}
