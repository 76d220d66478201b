use chrono::{DateTime, Duration, Utc};
use serde_json::json;

use crate::util::base64_url_encode;

fn encode(claims: serde_json::Value) -> String {
    let header = base64_url_encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = base64_url_encode(&claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

/// Unsigned token whose `exp` claim is `expires_at` (whole seconds).
pub fn token_expiring_at(expires_at: DateTime<Utc>) -> String {
    encode(json!({
        "sub": "11",
        "iat": (expires_at - Duration::hours(1)).timestamp(),
        "exp": expires_at.timestamp(),
    }))
}

pub fn token_expiring_in(seconds: i64) -> String {
    token_expiring_at(Utc::now() + Duration::seconds(seconds))
}

pub fn token_without_expiry() -> String {
    encode(json!({"sub": "11"}))
}
