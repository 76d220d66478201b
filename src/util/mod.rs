pub mod backoff;
pub mod base64;
pub mod hash;
pub mod jwt;
pub mod subscribe;
pub mod time;

pub use backoff::BackoffConfig;
pub use base64::{base64_url_decode, base64_url_encode};
pub use hash::sha256_hex;
pub use jwt::expiration_time as jwt_expiration_time;
pub use subscribe::Observers;
pub use time::{deserialize_optional_timestamp, parse_timestamp};
