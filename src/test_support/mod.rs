//! Test utilities shared across crate-level unit tests.

pub mod backend;
pub mod http;
pub mod tokens;

pub use backend::{sample_profile, FakeBackend};
pub use http::start_mock_server;
pub use tokens::{token_expiring_at, token_expiring_in, token_without_expiry};
