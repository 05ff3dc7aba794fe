use crate::api_client::ApiClient;
use crate::dto::{Envelope, MydataConsent, MydataConsentRequest};
use crate::error::ApiError;
use crate::normalizer::normalize_detail;
use crate::request::RequestConfig;
use reqwest::Method;

/// MyData (open banking) consent
pub struct MydataApi<'a> {
    client: &'a ApiClient,
}

impl<'a> MydataApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn consent_status(&self) -> Result<Envelope<MydataConsent>, ApiError> {
        let raw = self
            .client
            .get_raw("/mydata/consent", RequestConfig::default())
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    pub async fn give_consent(
        &self,
        request: &MydataConsentRequest,
    ) -> Result<Envelope<MydataConsent>, ApiError> {
        let raw = self
            .client
            .send_json(Method::POST, "/mydata/consent", request, RequestConfig::default())
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    pub async fn withdraw_consent(&self) -> Result<Envelope, ApiError> {
        self.client
            .delete("/mydata/consent", RequestConfig::default())
            .await
    }

    /// Ask the backend to pull fresh data from linked institutions
    pub async fn sync(&self) -> Result<Envelope, ApiError> {
        self.client
            .post_with_config("/mydata/sync", &serde_json::json!({}), RequestConfig::new().disable_retry())
            .await
    }
}
