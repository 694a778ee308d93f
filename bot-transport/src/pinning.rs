//! Certificate fingerprint pinning.
//!
//! The backend certificate must chain to the provisioned CA *and* its SHA-256
//! fingerprint must equal the pinned value. Both checks run inside the TLS
//! handshake, so a mismatch aborts the connection before any request bytes
//! are written.

use crate::error::{TransportError, TransportResult};
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, RootCertStore, SignatureScheme};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error};

/// SHA-256 fingerprint of the production backend certificate.
pub const BACKEND_CERT_FINGERPRINT: &str = "85:76:3F:1D:FF:FD:E3:79:1E:52:CE:50:77:6B:7B:50:A1:5A:E0:F0:6A:80:48:19:EC:A9:7A:B2:2C:E3:49:B5";

/// Expected SHA-256 fingerprint of the server's end-entity certificate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CertificatePin([u8; 32]);

impl CertificatePin {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Computes the pin for a DER certificate.
    pub fn of_certificate(der: &[u8]) -> Self {
        Self(Sha256::digest(der).into())
    }

    /// Returns true if `der` hashes to this pin.
    pub fn matches(&self, der: &[u8]) -> bool {
        Self::of_certificate(der) == *self
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Default for CertificatePin {
    fn default() -> Self {
        BACKEND_CERT_FINGERPRINT.parse().unwrap_or(Self([0; 32]))
    }
}

impl FromStr for CertificatePin {
    type Err = TransportError;

    /// Accepts `AA:BB:...` as well as plain hex.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| *c != ':').collect();
        let bytes = hex::decode(compact)
            .map_err(|e| TransportError::Config(format!("invalid fingerprint: {e}")))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
            TransportError::Config(format!("fingerprint must be 32 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for CertificatePin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CertificatePin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertificatePin({self})")
    }
}

/// Chain validation against the provisioned CA, followed by the pin check.
#[derive(Debug)]
pub struct PinnedVerifier {
    inner: Arc<WebPkiServerVerifier>,
    pin: CertificatePin,
}

impl PinnedVerifier {
    /// Builds a verifier trusting only the CA certificates in `ca_pem`.
    pub fn new(
        ca_pem: &str,
        pin: CertificatePin,
        provider: Arc<CryptoProvider>,
    ) -> TransportResult<Self> {
        let mut roots = RootCertStore::empty();
        let mut reader = ca_pem.as_bytes();
        for cert in rustls_pemfile::certs(&mut reader) {
            let cert = cert
                .map_err(|e| TransportError::KeyMaterial(format!("unreadable CA certificate: {e}")))?;
            roots
                .add(cert)
                .map_err(|e| TransportError::KeyMaterial(format!("rejected CA certificate: {e}")))?;
        }
        if roots.is_empty() {
            return Err(TransportError::KeyMaterial(
                "CA file contains no certificates".to_string(),
            ));
        }

        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), provider)
            .build()
            .map_err(|e| TransportError::Config(format!("cannot build verifier: {e}")))?;
        Ok(Self { inner, pin })
    }
}

impl ServerCertVerifier for PinnedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)?;

        let actual = CertificatePin::of_certificate(end_entity.as_ref());
        if actual != self.pin {
            error!(expected = %self.pin, %actual, "Certificate fingerprint mismatch");
            return Err(rustls::Error::General(
                "certificate fingerprint mismatch".to_string(),
            ));
        }
        debug!("Certificate fingerprint verified");
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

/// Client TLS configuration that trusts only `ca_pem` and enforces `pin`.
pub fn pinned_client_config(
    ca_pem: &str,
    pin: CertificatePin,
) -> TransportResult<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let verifier = PinnedVerifier::new(ca_pem, pin, provider.clone())?;
    let config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| TransportError::Config(format!("unsupported TLS versions: {e}")))?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    Ok(config)
}
