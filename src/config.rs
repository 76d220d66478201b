use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::{ClientError, ClientResult};
use crate::util::BackoffConfig;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_NOTIFICATION_PATH: &str = "/ws/notifications";

/// Runtime configuration of a [`Session`](crate::session::Session).
///
/// Deserializable so applications can embed it in their own config files; any
/// missing field falls back to its default.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Base URL of the REST API, e.g. `https://escrow.example.com/api`.
    pub api_base_url: String,
    /// WebSocket endpoint for notifications. Derived from `api_base_url` when unset.
    pub notification_url: Option<String>,
    /// Tokens expiring within this window are refreshed at startup.
    pub expiry_skew_secs: u64,
    /// Upper bound of how long before expiry the scheduled refresh fires.
    pub refresh_safety_margin_secs: u64,
    pub request_timeout_secs: u64,
    /// Consecutive scheduled refresh failures tolerated before giving up.
    pub max_refresh_attempts: u32,
    pub refresh_retry: BackoffConfig,
    pub reconnect: BackoffConfig,
    /// `None` keeps reconnecting for the whole session.
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            notification_url: None,
            expiry_skew_secs: 60,
            refresh_safety_margin_secs: 5 * 60,
            request_timeout_secs: 30,
            max_refresh_attempts: 3,
            refresh_retry: BackoffConfig::new(2_000, 60_000),
            reconnect: BackoffConfig::new(1_000, 30_000),
            max_reconnect_attempts: None,
        }
    }
}

impl ClientOptions {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            ..Default::default()
        }
    }

    pub fn expiry_skew(&self) -> Duration {
        Duration::from_secs(self.expiry_skew_secs)
    }

    pub fn refresh_safety_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_safety_margin_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn api_base(&self) -> ClientResult<Url> {
        let url = Url::parse(self.api_base_url.trim_end_matches('/'))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ClientError::InvalidConfig(format!(
                "unsupported API scheme `{other}`"
            ))),
        }
    }

    /// Notification endpoint without credentials. `http(s)` bases map to `ws(s)`.
    pub fn notification_base(&self) -> ClientResult<Url> {
        if let Some(explicit) = &self.notification_url {
            let url = Url::parse(explicit)?;
            return match url.scheme() {
                "ws" | "wss" => Ok(url),
                other => Err(ClientError::InvalidConfig(format!(
                    "unsupported notification scheme `{other}`"
                ))),
            };
        }

        let api = self.api_base()?;
        let scheme = if api.scheme() == "https" { "wss" } else { "ws" };
        let host = api
            .host_str()
            .ok_or_else(|| ClientError::InvalidConfig("API base URL has no host".into()))?;
        let authority = match api.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Url::parse(&format!(
            "{scheme}://{authority}{DEFAULT_NOTIFICATION_PATH}"
        ))?)
    }

    pub fn validate(&self) -> ClientResult<()> {
        self.api_base()?;
        self.notification_base()?;
        if self.max_refresh_attempts == 0 {
            return Err(ClientError::InvalidConfig(
                "max_refresh_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
