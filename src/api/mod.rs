//! HTTP access to the escrow backend.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

mod escrow;

use crate::config::ClientOptions;
use crate::error::{ClientError, ClientResult};
use crate::logger::Logger;
use crate::session::backend::{RefreshTokenResponse, SessionBackend};
use crate::session::model::UserProfile;
use crate::session::persistence::StoredSession;

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("escrow-client/api"));

const REFRESH_PATH: &str = "auth/refresh";
const PROFILE_PATH: &str = "users/me";

/// Authenticated REST client. The bearer token is read from session storage
/// on every request, so a refresh is picked up without rebuilding the client.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base: Arc<Url>,
    options: Arc<ClientOptions>,
    storage: StoredSession,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .finish()
    }
}

impl ApiClient {
    pub fn new(options: ClientOptions, storage: StoredSession) -> ClientResult<Self> {
        let base = options.api_base()?;
        let http = Client::builder()
            .cookie_store(true)
            .timeout(options.request_timeout())
            .build()
            .map_err(|err| ClientError::InvalidConfig(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            base: Arc::new(base),
            options: Arc::new(options),
            storage,
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn storage(&self) -> &StoredSession {
        &self.storage
    }

    /// Notification WebSocket URL carrying the current access token.
    pub fn notification_url(&self) -> ClientResult<Url> {
        let token = self
            .storage
            .access_token()?
            .ok_or_else(|| ClientError::Unauthenticated("no access token stored".into()))?;
        let mut url = self.options.notification_base()?;
        url.query_pairs_mut().append_pair("token", &token);
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        let endpoint = format!("{}/{}", self.base.as_str().trim_end_matches('/'), path);
        Ok(Url::parse(&endpoint)?)
    }

    fn request(&self, method: Method, path: &str) -> ClientResult<RequestBuilder> {
        let url = self.endpoint(path)?;
        let builder = self.http.request(method, url);
        Ok(match self.storage.access_token()? {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn execute<T>(&self, request: RequestBuilder) -> ClientResult<T>
    where
        T: DeserializeOwned,
    {
        let response = request
            .send()
            .await
            .map_err(|err| ClientError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = map_error_response(status, &body);
            LOGGER.debug(format!("request failed: {error}"));
            return Err(error);
        }

        response
            .json()
            .await
            .map_err(|err| ClientError::Decode(err.to_string()))
    }
}

#[async_trait]
impl SessionBackend for ApiClient {
    async fn refresh_token(&self) -> ClientResult<RefreshTokenResponse> {
        let request = self.request(Method::POST, REFRESH_PATH)?;
        let response: RefreshTokenResponse = self.execute(request).await?;
        if response.access_token.trim().is_empty() {
            return Err(ClientError::InvalidToken(
                "refresh response carried an empty access token".into(),
            ));
        }
        Ok(response)
    }

    async fn get_profile(&self) -> ClientResult<UserProfile> {
        let request = self.request(Method::GET, PROFILE_PATH)?;
        self.execute(request).await
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn map_error_response(status: StatusCode, body: &str) -> ClientError {
    let parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed with status {status}"));
    ClientError::http(status.as_u16(), parsed.code, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::persistence::InMemoryStorage;
    use crate::test_support::start_mock_server;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer, token: Option<&str>) -> ApiClient {
        let storage = StoredSession::new(InMemoryStorage::shared());
        if let Some(token) = token {
            storage.set_access_token(token).unwrap();
        }
        ApiClient::new(ClientOptions::new(server.url("/api")), storage).unwrap()
    }

    #[tokio::test]
    async fn refresh_returns_new_access_token() {
        let server = start_mock_server().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/refresh");
                then.status(200).json_body(json!({"access_token": "fresh"}));
            })
            .await;

        let client = client_for(&server, None);
        let response = client.refresh_token().await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.access_token, "fresh");
    }

    #[tokio::test]
    async fn profile_request_carries_bearer_token() {
        let server = start_mock_server().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/users/me")
                    .header("authorization", "Bearer stored-token");
                then.status(200).json_body(json!({
                    "id": 11,
                    "email": "buyer@example.com",
                    "activated": true
                }));
            })
            .await;

        let client = client_for(&server, Some("stored-token"));
        let profile = client.get_profile().await.unwrap();

        mock.assert_async().await;
        assert_eq!(profile.id, 11);
        assert!(profile.activated);
    }

    #[tokio::test]
    async fn error_bodies_keep_code_and_message() {
        let server = start_mock_server().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/refresh");
                then.status(401)
                    .json_body(json!({"code": "refresh_expired", "error": "Refresh token expired"}));
            })
            .await;

        let client = client_for(&server, None);
        let err = client.refresh_token().await.unwrap_err();
        assert_eq!(
            err,
            ClientError::http(401, Some("refresh_expired".into()), "Refresh token expired")
        );
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn empty_refresh_token_is_rejected() {
        let server = start_mock_server().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/auth/refresh");
                then.status(200).json_body(json!({"access_token": ""}));
            })
            .await;

        let client = client_for(&server, None);
        assert!(matches!(
            client.refresh_token().await,
            Err(ClientError::InvalidToken(_))
        ));
    }

    #[test]
    fn non_json_error_body_gets_generic_message() {
        let err = map_error_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("Request failed with status 502"));
    }

    #[test]
    fn notification_url_requires_token() {
        let storage = StoredSession::new(InMemoryStorage::shared());
        let client = ApiClient::new(
            ClientOptions::new("https://escrow.example.com/api"),
            storage.clone(),
        )
        .unwrap();
        assert!(matches!(
            client.notification_url(),
            Err(ClientError::Unauthenticated(_))
        ));

        storage.set_access_token("abc").unwrap();
        assert_eq!(
            client.notification_url().unwrap().as_str(),
            "wss://escrow.example.com/ws/notifications?token=abc"
        );
    }
}
