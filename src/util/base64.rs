use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::engine::Engine as _;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeBase64Error;

impl fmt::Display for DecodeBase64Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to decode base64 string")
    }
}

impl std::error::Error for DecodeBase64Error {}

/// Encode bytes with the URL-safe alphabet and no padding, as used by JWT segments.
pub fn base64_url_encode_bytes(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn base64_url_encode(input: &str) -> String {
    base64_url_encode_bytes(input.as_bytes())
}

/// Decode a URL-safe segment, returning UTF-8 text on success.
pub fn base64_url_decode(input: &str) -> Result<String, DecodeBase64Error> {
    let bytes = base64_url_decode_bytes(input)?;
    String::from_utf8(bytes).map_err(|_err| DecodeBase64Error)
}

/// Decode into raw bytes. Padding is optional; standard-alphabet `+` and `/` are tolerated.
pub fn base64_url_decode_bytes(input: &str) -> Result<Vec<u8>, DecodeBase64Error> {
    let mut normalized: String = input
        .trim()
        .chars()
        .map(|ch| match ch {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let remainder = normalized.len() % 4;
    if remainder != 0 {
        normalized.extend("===".chars().take(4 - remainder));
    }
    URL_SAFE
        .decode(normalized.as_bytes())
        .map_err(|_err| DecodeBase64Error)
}
