use crate::api_client::ApiClient;
use crate::dto::{AllocateSlotsRequest, Envelope, Slot, SlotUpdate};
use crate::error::ApiError;
use crate::normalizer::{normalize_detail, normalize_list, ResourceKind};
use crate::request::RequestConfig;
use reqwest::Method;

/// Budget slots of an account
pub struct SlotApi<'a> {
    client: &'a ApiClient,
}

impl<'a> SlotApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, account_id: &str) -> Result<Envelope<Vec<Slot>>, ApiError> {
        let raw = self
            .client
            .get_raw_with_fallback(
                &format!("/accounts/{}/slots", account_id),
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_list(&raw, ResourceKind::Slots, None).decode_items())
    }

    pub async fn get(&self, slot_id: &str) -> Result<Envelope<Slot>, ApiError> {
        let raw = self
            .client
            .get_raw(&format!("/slots/{}", slot_id), RequestConfig::default())
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    /// Replace the slot layout of an account
    pub async fn allocate(
        &self,
        account_id: &str,
        request: &AllocateSlotsRequest,
    ) -> Result<Envelope<Vec<Slot>>, ApiError> {
        let raw = self
            .client
            .send_json(
                Method::POST,
                &format!("/accounts/{}/slots", account_id),
                request,
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_list(&raw, ResourceKind::Slots, None).decode_items())
    }

    pub async fn update(&self, slot_id: &str, update: &SlotUpdate) -> Result<Envelope<Slot>, ApiError> {
        let raw = self
            .client
            .send_json(
                Method::PATCH,
                &format!("/slots/{}", slot_id),
                update,
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    pub async fn delete(&self, slot_id: &str) -> Result<Envelope, ApiError> {
        self.client
            .delete(&format!("/slots/{}", slot_id), RequestConfig::default())
            .await
    }
}
