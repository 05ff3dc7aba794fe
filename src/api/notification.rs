use crate::api_client::ApiClient;
use crate::dto::{Envelope, ListParams, Meta, Notification, PushTokenRegistration, UnreadCount};
use crate::error::ApiError;
use crate::normalizer::{normalize_detail, normalize_list, ResourceKind};
use crate::request::RequestConfig;
use serde_json::json;
use tracing::warn;

const LIST_FAILED_MESSAGE: &str = "알림 목록을 불러오지 못했습니다.";

pub struct NotificationApi<'a> {
    client: &'a ApiClient,
}

impl<'a> NotificationApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Notification inbox.
    ///
    /// Failures come back as `success: false` with an empty list rather than an error.
    pub async fn list(&self, params: ListParams) -> Envelope<Vec<Notification>> {
        let result = self
            .client
            .get_raw_with_fallback(
                "/notifications",
                RequestConfig::new().params(params.to_query()),
            )
            .await;

        match result {
            Ok(raw) => {
                normalize_list(&raw, ResourceKind::Notifications, Some(&params)).decode_items()
            }
            Err(err) => {
                warn!(request_id = %err.request_id(), "Notification list failed: {}", err);
                Envelope::failed(Vec::new(), LIST_FAILED_MESSAGE).with_meta(Meta::empty(&params))
            }
        }
    }

    pub async fn mark_read(&self, notification_id: &str) -> Result<Envelope, ApiError> {
        self.client
            .patch(
                &format!("/notifications/{}/read", notification_id),
                &json!({}),
                RequestConfig::default(),
            )
            .await
    }

    pub async fn mark_all_read(&self) -> Result<Envelope, ApiError> {
        self.client
            .patch("/notifications/read-all", &json!({}), RequestConfig::default())
            .await
    }

    pub async fn unread_count(&self) -> Result<Envelope<UnreadCount>, ApiError> {
        let raw = self
            .client
            .get_raw("/notifications/unread-count", RequestConfig::default())
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    pub async fn register_push_token(
        &self,
        push_token: &str,
        platform: &str,
    ) -> Result<Envelope, ApiError> {
        let registration = PushTokenRegistration {
            push_token: push_token.to_string(),
            platform: platform.to_string(),
            device_id: self.client.device_id().await,
        };
        self.client
            .post("/notifications/push-token", &registration)
            .await
    }
}
