use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ClientResult;
use crate::session::model::UserProfile;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefreshTokenResponse {
    pub access_token: String,
}

/// The two backend calls the session lifecycle depends on.
///
/// [`ApiClient`](crate::api::ApiClient) is the production implementation; the
/// refresh credential travels out-of-band (an HTTP-only cookie), so neither
/// call takes arguments.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn refresh_token(&self) -> ClientResult<RefreshTokenResponse>;
    async fn get_profile(&self) -> ClientResult<UserProfile>;
}
