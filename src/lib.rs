#![doc = include_str!("RUSTDOC.md")]

pub mod api;
pub mod config;
pub mod error;
pub mod escrow;
pub mod logger;
pub mod notifications;
pub mod platform;
pub mod session;
pub mod util;

pub use api::ApiClient;
pub use config::ClientOptions;
pub use error::{ClientError, ClientResult};
pub use session::{Session, SessionBuilder, SessionState};

#[cfg(test)]
pub mod test_support;
