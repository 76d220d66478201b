//! Unverified JWT decoding. Signatures are never checked client-side; the
//! decoded claims are only used to plan refreshes.

use crate::util::base64::base64_url_decode;
use serde_json::{Map, Value};

/// Claims object of a compact JWT. Returns `None` unless exactly three
/// segments are present and the claims segment decodes to a JSON object.
pub fn decode_claims(token: &str) -> Option<Map<String, Value>> {
    let mut parts = token.trim().split('.');
    let _header = parts.next()?;
    let claims_part = parts.next()?;
    let _signature = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    match decode_part(claims_part)? {
        Value::Object(claims) => Some(claims),
        _ => None,
    }
}

/// The `exp` claim in seconds since the Unix epoch.
pub fn expiration_time(token: &str) -> Option<i64> {
    decode_claims(token)?.get("exp").and_then(value_as_i64)
}

fn decode_part(part: &str) -> Option<Value> {
    if part.is_empty() {
        return None;
    }
    let decoded = base64_url_decode(part).ok()?;
    serde_json::from_str::<Value>(&decoded).ok()
}

fn value_as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_u64().map(|v| v as i64))
        .or_else(|| value.as_f64().map(|v| v.floor() as i64))
}
