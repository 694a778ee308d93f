//! Signed transport to the Banking of Things backend.
//!
//! - [`EnvelopeSigner`] wraps JSON payloads into RS256 envelopes
//! - [`decode_response`] extracts the logical payload from `x.y[.z]` bodies
//! - [`HttpsTransport`] sends requests over pinned TLS (or plain HTTP when
//!   no CA is provisioned) with the device's identity headers
//! - [`TcpProbe`] tells the delivery engine whether the backend is reachable

mod client;
mod envelope;
mod error;
mod pinning;
mod probe;
mod response;

pub use client::{
    BackendConfig, BackendTransport, DEFAULT_BASE_PATH, DEFAULT_HOST, Endpoint, HttpsTransport,
    Method,
};
pub use envelope::{ENVELOPE_HEADER, EnvelopeSigner, SignedEnvelope};
pub use error::{TransportError, TransportResult};
pub use pinning::{BACKEND_CERT_FINGERPRINT, CertificatePin, PinnedVerifier, pinned_client_config};
pub use probe::{ConnectivityProbe, TcpProbe};
pub use response::decode_response;
