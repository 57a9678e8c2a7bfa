//! The lightning-daemon gRPC collaborator (§1, §4.C, §4.D, §6). The wire
//! protocol to lnd is explicitly an external interface the core only
//! consumes through a narrow trait; this module is the thin wrapper, not a
//! full lnd client.

mod proto {
    tonic::include_proto!("lnd");
}

use crate::error::{Error, Result};
use async_trait::async_trait;
use proto::lightning_client::LightningClient;
use proto::{AddInvoiceRequest, ConnectPeerRequest, ListChannelsRequest, SendPaymentRequest};
use std::time::Duration;
use tonic::service::interceptor::InterceptedService;
use tonic::transport::{Certificate, Channel, ClientTlsConfig};
use tonic::{Request, Status};

const CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Attaches the hex-encoded macaroon lnd expects on every call's metadata.
#[derive(Clone)]
struct MacaroonAuth {
    macaroon_hex: String,
}

impl tonic::service::Interceptor for MacaroonAuth {
    fn call(&mut self, mut request: Request<()>) -> std::result::Result<Request<()>, Status> {
        request.metadata_mut().insert(
            "macaroon",
            self.macaroon_hex
                .parse()
                .map_err(|_| Status::invalid_argument("malformed macaroon"))?,
        );
        Ok(request)
    }
}

type AuthedLightningClient = LightningClient<InterceptedService<Channel, MacaroonAuth>>;

/// A counterparty's lightning channel, as reported by `ListChannels` (§4.D).
#[derive(Debug, Clone)]
pub struct LightningChannel {
    pub remote_pubkey: String,
    pub channel_id: u64,
    pub capacity_sat: i64,
    pub local_balance_sat: i64,
}

/// The narrow slice of lnd functionality the dispatcher calls. Kept as a
/// trait so tests can substitute an in-memory fake (§8's scenario tests).
#[async_trait]
pub trait LndClient: Send + Sync {
    async fn connect_peer(&self, pubkey: &str, host: &str) -> Result<()>;
    async fn list_channels(&self, peer_pubkey: &str) -> Result<Vec<LightningChannel>>;
    async fn add_invoice(&self, value_sat: i64, preimage: [u8; 32]) -> Result<String>;
    async fn pay_invoice(&self, payment_request: &str) -> Result<[u8; 32]>;
}

pub struct GrpcLndClient {
    client: AuthedLightningClient,
}

impl GrpcLndClient {
    pub async fn connect(
        host: &str,
        port: u16,
        tls_cert_pem: &[u8],
        macaroon_hex: String,
    ) -> Result<Self> {
        let tls = ClientTlsConfig::new().ca_certificate(Certificate::from_pem(tls_cert_pem));
        let channel = Channel::from_shared(format!("https://{host}:{port}"))
            .map_err(|e| Error::LndCallFailed(e.to_string()))?
            .tls_config(tls)
            .map_err(|e| Error::LndCallFailed(e.to_string()))?
            .connect()
            .await
            .map_err(|e| Error::LndCallFailed(e.to_string()))?;

        let client = LightningClient::with_interceptor(channel, MacaroonAuth { macaroon_hex });

        Ok(GrpcLndClient { client })
    }

    fn timed<T>(req: T) -> Request<T> {
        let mut request = Request::new(req);
        request.set_timeout(CALL_TIMEOUT);
        request
    }
}

#[async_trait]
impl LndClient for GrpcLndClient {
    async fn connect_peer(&self, pubkey: &str, host: &str) -> Result<()> {
        let mut client = self.client.clone();
        client
            .connect_peer(Self::timed(ConnectPeerRequest {
                pubkey: pubkey.to_string(),
                host: host.to_string(),
            }))
            .await
            .map_err(|e| Error::LndCallFailed(e.to_string()))?;
        Ok(())
    }

    async fn list_channels(&self, peer_pubkey: &str) -> Result<Vec<LightningChannel>> {
        let mut client = self.client.clone();
        let response = client
            .list_channels(Self::timed(ListChannelsRequest {
                peer_pubkey: peer_pubkey.to_string(),
            }))
            .await
            .map_err(|e| Error::LndCallFailed(e.to_string()))?
            .into_inner();

        Ok(response
            .channels
            .into_iter()
            .map(|c| LightningChannel {
                remote_pubkey: c.remote_pubkey,
                channel_id: c.channel_id,
                capacity_sat: c.capacity,
                local_balance_sat: c.local_balance,
            })
            .collect())
    }

    async fn add_invoice(&self, value_sat: i64, preimage: [u8; 32]) -> Result<String> {
        let mut client = self.client.clone();
        let response = client
            .add_invoice(Self::timed(AddInvoiceRequest {
                value_sat,
                r_preimage: preimage.to_vec(),
            }))
            .await
            .map_err(|e| Error::LndCallFailed(e.to_string()))?
            .into_inner();
        Ok(response.payment_request)
    }

    async fn pay_invoice(&self, payment_request: &str) -> Result<[u8; 32]> {
        let mut client = self.client.clone();
        let response = client
            .send_payment_sync(Self::timed(SendPaymentRequest {
                payment_request: payment_request.to_string(),
            }))
            .await
            .map_err(|e| Error::LndCallFailed(e.to_string()))?
            .into_inner();

        if !response.payment_error.is_empty() {
            return Err(Error::LndCallFailed(response.payment_error));
        }

        response
            .payment_preimage
            .try_into()
            .map_err(|_| Error::LndCallFailed("lnd returned a malformed preimage".into()))
    }
}
