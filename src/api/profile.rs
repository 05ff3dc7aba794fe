use crate::api_client::ApiClient;
use crate::dto::{ChangePinRequest, Envelope, Profile, ProfileUpdate};
use crate::error::ApiError;
use crate::normalizer::normalize_detail;
use crate::request::RequestConfig;
use reqwest::Method;

pub struct ProfileApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ProfileApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<Envelope<Profile>, ApiError> {
        let raw = self
            .client
            .get_raw_with_fallback("/users/me", RequestConfig::default())
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    pub async fn update(&self, update: &ProfileUpdate) -> Result<Envelope<Profile>, ApiError> {
        let raw = self
            .client
            .send_json(Method::PATCH, "/users/me", update, RequestConfig::default())
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    pub async fn change_pin(&self, old_pin: &str, new_pin: &str) -> Result<Envelope, ApiError> {
        let request = ChangePinRequest {
            old_pin: old_pin.to_string(),
            new_pin: new_pin.to_string(),
        };
        self.client
            .put("/users/me/pin", &request, RequestConfig::new().disable_retry())
            .await
    }
}
