use crate::api_client::ApiClient;
use crate::dto::{Envelope, MonthlyReport, SlotSpending};
use crate::error::ApiError;
use crate::normalizer::{normalize_detail, normalize_list, ResourceKind};
use crate::request::RequestConfig;

pub struct ReportApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ReportApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn monthly(&self, year: i32, month: u32) -> Result<Envelope<MonthlyReport>, ApiError> {
        let raw = self
            .client
            .get_raw(
                "/reports/monthly",
                RequestConfig::new().param("year", year).param("month", month),
            )
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    /// Spending per slot for one account
    pub async fn slot_summary(&self, account_id: &str) -> Result<Envelope<Vec<SlotSpending>>, ApiError> {
        let raw = self
            .client
            .get_raw_with_fallback(
                &format!("/reports/accounts/{}/slots", account_id),
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_list(&raw, ResourceKind::Slots, None).decode_items())
    }
}
