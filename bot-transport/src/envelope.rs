//! RS256 request envelopes.
//!
//! Every POST body is `{"bot": "<header>.<payload>.<signature>"}` where each
//! segment is unpadded base64url. The signature is RSASSA-PKCS1-v1_5 over the
//! SHA-256 digest of `<header>.<payload>`.

use crate::error::{TransportError, TransportResult};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::fmt;

/// Fixed JOSE header for every envelope.
pub const ENVELOPE_HEADER: &str = r#"{"alg":"RS256","typ":"JWT"}"#;

/// A signed `header.payload.signature` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    header: String,
    payload: String,
    signature: String,
}

impl SignedEnvelope {
    /// Encoded header segment.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Encoded payload segment.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Encoded signature segment.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The bytes covered by the signature.
    pub fn signing_input(&self) -> String {
        format!("{}.{}", self.header, self.payload)
    }

    /// Wraps the envelope into the request body the backend expects.
    pub fn to_request_body(&self) -> Value {
        json!({ "bot": self.to_string() })
    }

    /// Decodes the payload segment back into JSON.
    pub fn decode_payload(&self) -> TransportResult<Value> {
        decode_segment(&self.payload)
    }

    /// Checks the signature against a PEM public key (SPKI or PKCS#1).
    pub fn verify(&self, public_key_pem: &str) -> TransportResult<()> {
        let key = RsaPublicKey::from_public_key_pem(public_key_pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(public_key_pem))
            .map_err(|e| TransportError::KeyMaterial(format!("invalid public key: {e}")))?;
        let signature = URL_SAFE_NO_PAD
            .decode(&self.signature)
            .map_err(|e| TransportError::Signing(format!("signature is not base64url: {e}")))?;
        let digest = Sha256::digest(self.signing_input().as_bytes());
        key.verify(Pkcs1v15Sign::new::<Sha256>(), &digest, &signature)
            .map_err(|e| TransportError::Signing(format!("signature mismatch: {e}")))
    }

    /// Parses an envelope string without checking the signature.
    pub fn parse(envelope: &str) -> TransportResult<Self> {
        let mut parts = envelope.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s), None) if !h.is_empty() && !p.is_empty() => Ok(Self {
                header: h.to_string(),
                payload: p.to_string(),
                signature: s.to_string(),
            }),
            _ => Err(TransportError::MalformedResponse(
                "envelope must have three segments".to_string(),
            )),
        }
    }
}

impl fmt::Display for SignedEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.header, self.payload, self.signature)
    }
}

/// Signs payloads with the device's RSA private key.
#[derive(Clone)]
pub struct EnvelopeSigner {
    key: RsaPrivateKey,
}

impl fmt::Debug for EnvelopeSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeSigner").finish_non_exhaustive()
    }
}

impl EnvelopeSigner {
    /// Parses a PEM private key, PKCS#8 first, then PKCS#1.
    pub fn from_pem(pem: &str) -> TransportResult<Self> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| TransportError::KeyMaterial(format!("invalid private key: {e}")))?;
        Ok(Self { key })
    }

    /// Builds and signs an envelope around `payload`.
    pub fn sign(&self, payload: &Value) -> TransportResult<SignedEnvelope> {
        let header = URL_SAFE_NO_PAD.encode(ENVELOPE_HEADER);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
        let digest = Sha256::digest(format!("{header}.{payload}").as_bytes());
        let signature = self
            .key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| TransportError::Signing(e.to_string()))?;

        Ok(SignedEnvelope {
            header,
            payload,
            signature: URL_SAFE_NO_PAD.encode(signature),
        })
    }
}

/// Decodes one base64url segment into JSON. Stray padding is tolerated.
pub(crate) fn decode_segment(segment: &str) -> TransportResult<Value> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment.trim().trim_end_matches('='))
        .map_err(|e| TransportError::MalformedResponse(format!("segment is not base64url: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TransportError::MalformedResponse(format!("segment is not JSON: {e}")))
}
