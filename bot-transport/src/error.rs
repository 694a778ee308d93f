//! Transport error types.

use std::error::Error as StdError;
use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Why a backend call did not produce a logical response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend could not be reached at all.
    #[error("no connectivity: {0}")]
    NoConnectivity(String),

    /// The server certificate failed chain validation or the fingerprint pin.
    #[error("TLS verification failed: {0}")]
    TlsVerifyFailed(String),

    /// The backend answered with something other than 200.
    #[error("backend returned HTTP {0}")]
    HttpStatus(u16),

    /// A 200 response whose body is not a decodable envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The request envelope could not be signed. Nothing was sent.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Key material is missing or unparseable.
    #[error("key material error: {0}")]
    KeyMaterial(String),

    /// The call exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// The client could not be built from the given configuration.
    #[error("invalid transport configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransportError {
    /// Returns true if the backend was never reached.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, TransportError::NoConnectivity(_) | TransportError::Timeout)
    }

    /// Returns true if the backend answered and refused the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, TransportError::HttpStatus(_))
    }

    /// Returns the HTTP status for backend rejections.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::HttpStatus(code) => Some(*code),
            _ => None,
        }
    }
}

impl From<bot_storage::StorageError> for TransportError {
    fn from(e: bot_storage::StorageError) -> Self {
        TransportError::KeyMaterial(e.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return TransportError::Timeout;
        }
        if let Some(tls) = find_tls_error(&e) {
            return TransportError::TlsVerifyFailed(tls);
        }
        if e.is_builder() {
            return TransportError::Config(e.to_string());
        }
        if let Some(status) = e.status() {
            return TransportError::HttpStatus(status.as_u16());
        }
        if e.is_decode() {
            return TransportError::MalformedResponse(e.to_string());
        }
        TransportError::NoConnectivity(e.to_string())
    }
}

/// Walks the source chain looking for a rustls failure.
///
/// hyper wraps TLS errors in `io::Error`, whose `source()` skips the wrapped
/// error, so `io::Error::get_ref` is checked explicitly.
fn find_tls_error(e: &reqwest::Error) -> Option<String> {
    let mut source: Option<&(dyn StdError + 'static)> = e.source();
    while let Some(cause) = source {
        if let Some(tls) = cause.downcast_ref::<rustls::Error>() {
            return Some(tls.to_string());
        }
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if let Some(tls) = io.get_ref().and_then(|inner| inner.downcast_ref::<rustls::Error>()) {
                return Some(tls.to_string());
            }
        }
        source = cause.source();
    }
    None
}
