use crate::api_client::ApiClient;
use crate::dto::{Envelope, ListParams, SplitRequest, Transaction};
use crate::error::{ApiError, ErrorCode};
use crate::normalizer::{normalize_detail, normalize_list, ResourceKind};
use crate::request::{new_request_id, RequestConfig};
use reqwest::Method;
use serde_json::json;

pub struct TransactionApi<'a> {
    client: &'a ApiClient,
}

impl<'a> TransactionApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(
        &self,
        account_id: &str,
        params: ListParams,
    ) -> Result<Envelope<Vec<Transaction>>, ApiError> {
        let raw = self
            .client
            .get_raw_with_fallback(
                &format!("/accounts/{}/transactions", account_id),
                RequestConfig::new().params(params.to_query()),
            )
            .await?;
        Ok(normalize_list(&raw, ResourceKind::Transactions, Some(&params)).decode_items())
    }

    pub async fn get(&self, transaction_id: &str) -> Result<Envelope<Transaction>, ApiError> {
        let raw = self
            .client
            .get_raw(
                &format!("/transactions/{}", transaction_id),
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    /// Split one transaction across several slots
    pub async fn split(
        &self,
        transaction_id: &str,
        request: &SplitRequest,
    ) -> Result<Envelope<Vec<Transaction>>, ApiError> {
        if request.splits.is_empty() {
            return Err(ApiError::new(
                ErrorCode::Request,
                "분할할 항목이 없습니다.",
                &new_request_id(),
            ));
        }
        let raw = self
            .client
            .send_json(
                Method::POST,
                &format!("/transactions/{}/split", transaction_id),
                request,
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_list(&raw, ResourceKind::Transactions, None).decode_items())
    }

    pub async fn assign_slot(
        &self,
        transaction_id: &str,
        slot_id: &str,
    ) -> Result<Envelope<Transaction>, ApiError> {
        let raw = self
            .client
            .send_json(
                Method::PATCH,
                &format!("/transactions/{}/slot", transaction_id),
                &json!({ "slotId": slot_id }),
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_detail(&raw).decode())
    }
}
