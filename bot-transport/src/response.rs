//! Decoding of backend responses.

use crate::envelope::decode_segment;
use crate::error::{TransportError, TransportResult};
use serde_json::Value;

/// Extracts the logical payload from a 200 response body.
///
/// The body is `x.y[.z]`. Only `y` matters: it decodes to `{"bot": ...}` and
/// the `bot` field is the logical response. String values come back as-is,
/// anything else as its JSON text. A missing or null `bot` is the empty
/// string.
pub fn decode_response(body: &str) -> TransportResult<String> {
    let body = body.trim();
    let mut segments = body.split('.');
    let (Some(_), Some(payload)) = (segments.next(), segments.next()) else {
        return Err(TransportError::MalformedResponse(format!(
            "expected dot-separated envelope, got {} bytes",
            body.len()
        )));
    };

    let decoded = decode_segment(payload)?;
    Ok(match decoded.get("bot") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    })
}
