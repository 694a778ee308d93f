//! Authenticated backend client.

use crate::envelope::{EnvelopeSigner, SignedEnvelope};
use crate::error::{TransportError, TransportResult};
use crate::pinning::{CertificatePin, pinned_client_config};
use crate::response::decode_response;
use async_trait::async_trait;
use bot_storage::KeyMaterialStore;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Production backend host.
pub const DEFAULT_HOST: &str = "api.bankingofthings.io";
/// Path prefix for all device endpoints.
pub const DEFAULT_BASE_PATH: &str = "/bot_iot";

/// Where and how to reach the backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub host: String,
    pub base_path: String,
    pub https_port: u16,
    pub http_port: u16,
    /// When false the transport always uses plain HTTP.
    pub https: bool,
    /// Expected fingerprint of the backend certificate.
    pub fingerprint: CertificatePin,
    /// Upper bound on each call, connect included.
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            https_port: 443,
            http_port: 80,
            https: true,
            fingerprint: CertificatePin::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Backend endpoints the device talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Actions,
    Pairing,
    Activation,
    Messages,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Actions => "/actions",
            Endpoint::Pairing => "/pair",
            Endpoint::Activation => "/status",
            Endpoint::Messages => "/messages",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
        })
    }
}

/// A request/response channel to the backend.
///
/// Implementations return the decoded logical payload of a 200 response.
#[async_trait]
pub trait BackendTransport: Send + Sync {
    /// Sends one request. POST payloads are signed; GETs carry no body.
    async fn send(
        &self,
        method: Method,
        endpoint: Endpoint,
        payload: Option<&Value>,
    ) -> TransportResult<String>;

    async fn get(&self, endpoint: Endpoint) -> TransportResult<String> {
        self.send(Method::Get, endpoint, None).await
    }

    async fn post(&self, endpoint: Endpoint, payload: &Value) -> TransportResult<String> {
        self.send(Method::Post, endpoint, Some(payload)).await
    }
}

/// Transport over HTTPS with certificate pinning, or plain HTTP in degraded mode.
pub struct HttpsTransport {
    keys: Arc<dyn KeyMaterialStore>,
    signer: Option<EnvelopeSigner>,
    client: Client,
    base_url: String,
    secure: bool,
}

impl HttpsTransport {
    /// Builds the client for the given identity.
    ///
    /// Without a CA certificate, or with HTTPS disabled in either the backend
    /// or the device configuration, the transport runs over plain HTTP.
    pub fn new(config: BackendConfig, keys: Arc<dyn KeyMaterialStore>) -> TransportResult<Self> {
        let tls = if config.https && keys.https_enabled() {
            match keys.ca_cert_pem() {
                Some(ca) => Some(pinned_client_config(ca, config.fingerprint)?),
                None => {
                    warn!("No CA certificate provisioned, running in degraded plaintext mode");
                    None
                }
            }
        } else {
            warn!("HTTPS disabled by configuration, running in degraded plaintext mode");
            None
        };

        let mut builder = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout)
            .pool_max_idle_per_host(0);

        let secure = tls.is_some();
        let base_url = match tls {
            Some(tls) => {
                builder = builder.use_preconfigured_tls(tls).https_only(true);
                format!("https://{}:{}{}", config.host, config.https_port, config.base_path)
            }
            None => format!("http://{}:{}{}", config.host, config.http_port, config.base_path),
        };
        let client = builder
            .build()
            .map_err(|e| TransportError::Config(format!("failed to create HTTP client: {e}")))?;

        let signer = match keys
            .private_key_pem()
            .map_err(TransportError::from)
            .and_then(EnvelopeSigner::from_pem)
        {
            Ok(signer) => Some(signer),
            Err(e) => {
                warn!("Request signing unavailable: {e}");
                None
            }
        };

        info!(%base_url, secure, "Backend transport ready");
        Ok(Self {
            keys,
            signer,
            client,
            base_url,
            secure,
        })
    }

    /// Returns true when requests go over pinned TLS.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn sign(&self, payload: &Value) -> TransportResult<SignedEnvelope> {
        match &self.signer {
            Some(signer) => signer.sign(payload),
            None => EnvelopeSigner::from_pem(self.keys.private_key_pem()?)?.sign(payload),
        }
    }
}

#[async_trait]
impl BackendTransport for HttpsTransport {
    async fn send(
        &self,
        method: Method,
        endpoint: Endpoint,
        payload: Option<&Value>,
    ) -> TransportResult<String> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let request = match method {
            Method::Get => self.client.get(&url),
            Method::Post => {
                let null = Value::Null;
                let envelope = self.sign(payload.unwrap_or(&null)).inspect_err(|e| {
                    error!(%endpoint, "Request not sent, signing failed: {e}");
                })?;
                self.client.post(&url).json(&envelope.to_request_body())
            }
        };

        debug!(%method, %endpoint, "Calling backend");
        let response = request
            .header("makerID", self.keys.maker_id())
            .header("deviceID", self.keys.device_id())
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!(%method, %endpoint, status = status.as_u16(), "Backend rejected request");
            return Err(TransportError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        let logical = decode_response(&body)?;
        debug!(%endpoint, response = %logical, "Backend responded");
        Ok(logical)
    }
}
