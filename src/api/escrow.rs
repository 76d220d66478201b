use reqwest::Method;

use crate::api::ApiClient;
use crate::error::ClientResult;
use crate::escrow::{
    CreateEscrowRequest, DashboardData, Escrow, EscrowDraft, EscrowList, EscrowListPayload,
};
use crate::session::UserProfile;

const MY_ESCROWS_PATH: &str = "escrows/my";
const ESCROWS_PATH: &str = "escrows";

impl ApiClient {
    /// Escrows where the current user is buyer or seller.
    pub async fn list_my_escrows(&self) -> ClientResult<EscrowList> {
        let request = self.request(Method::GET, MY_ESCROWS_PATH)?;
        let payload: EscrowListPayload = self.execute(request).await?;
        Ok(payload.into())
    }

    pub async fn dashboard(&self) -> ClientResult<DashboardData> {
        let list = self.list_my_escrows().await?;
        Ok(DashboardData::from_list(&list))
    }

    pub async fn get_escrow(&self, id: i64) -> ClientResult<Escrow> {
        let request = self.request(Method::GET, &format!("{ESCROWS_PATH}/{id}"))?;
        self.execute(request).await
    }

    pub async fn create_escrow(&self, body: &CreateEscrowRequest) -> ClientResult<Escrow> {
        let request = self.request(Method::POST, ESCROWS_PATH)?.json(body);
        self.execute(request).await
    }

    /// Validates `draft` against the buyer before any request is sent, then
    /// creates the escrow with the composed conditions text.
    pub async fn submit_escrow_draft(
        &self,
        draft: &EscrowDraft,
        buyer: &UserProfile,
    ) -> ClientResult<Escrow> {
        let body = draft.to_request(buyer)?;
        self.create_escrow(&body).await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::ApiClient;
    use crate::config::ClientOptions;
    use crate::error::ClientError;
    use crate::escrow::{EscrowDraft, EscrowStatus, EscrowValidationError, SellerRef};
    use crate::session::persistence::{InMemoryStorage, StoredSession};
    use crate::session::{UserProfile, UserRole};
    use crate::test_support::start_mock_server;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> ApiClient {
        let storage = StoredSession::new(InMemoryStorage::shared());
        storage.set_access_token("token").unwrap();
        ApiClient::new(ClientOptions::new(server.url("/api")), storage).unwrap()
    }

    fn buyer() -> UserProfile {
        UserProfile {
            id: 1,
            email: Some("buyer@example.com".into()),
            first_name: Some("Abebe".into()),
            last_name: None,
            activated: true,
            role: UserRole::User,
        }
    }

    fn seller() -> SellerRef {
        SellerRef {
            id: 2,
            name: "Sara".into(),
            activated: Some(true),
        }
    }

    #[tokio::test]
    async fn zero_amount_never_reaches_the_backend() {
        let server = start_mock_server().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/escrows");
                then.status(201).json_body(json!({"id": 1}));
            })
            .await;

        let client = client_for(&server);
        let err = client
            .submit_escrow_draft(&EscrowDraft::new(seller(), 0.0), &buyer())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ClientError::Validation(EscrowValidationError::InvalidAmount(0.0))
        );
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn submit_posts_composed_request() {
        let server = start_mock_server().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/escrows")
                    .header("authorization", "Bearer token")
                    .json_body(json!({
                        "seller_id": 2,
                        "amount": 1200.0,
                        "conditions": "Buyer: Abebe\n\nSeller: Sara\n"
                    }));
                then.status(201).json_body(json!({
                    "id": 77,
                    "buyer_id": 1,
                    "seller_id": 2,
                    "amount": 1200.0,
                    "status": "Pending"
                }));
            })
            .await;

        let client = client_for(&server);
        let escrow = client
            .submit_escrow_draft(&EscrowDraft::new(seller(), 1200.0), &buyer())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(escrow.id, 77);
        assert_eq!(escrow.status, EscrowStatus::Pending);
    }

    #[tokio::test]
    async fn dashboard_merges_server_summary() {
        let server = start_mock_server().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/escrows/my");
                then.status(200).json_body(json!({
                    "escrows": [
                        {"id": 1, "amount": 100.0, "status": "Funded"},
                        {"id": 2, "amount": 300.0, "status": "Released"}
                    ],
                    "summary": {"total": 12}
                }));
            })
            .await;

        let dashboard = client_for(&server).dashboard().await.unwrap();
        assert_eq!(dashboard.recent.len(), 2);
        assert_eq!(dashboard.summary.total, 12);
        assert_eq!(dashboard.summary.active, 1);
        assert_eq!(dashboard.summary.total_amount, 400.0);
    }

    #[tokio::test]
    async fn get_escrow_by_id() {
        let server = start_mock_server().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/escrows/9");
                then.status(200)
                    .json_body(json!({"id": 9, "amount": 150.0, "status": "Disputed"}));
            })
            .await;

        let escrow = client_for(&server).get_escrow(9).await.unwrap();
        assert_eq!(escrow.status, EscrowStatus::Disputed);
    }
}
