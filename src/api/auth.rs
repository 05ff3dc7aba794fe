use crate::api_client::ApiClient;
use crate::dto::{
    AuthSession, Envelope, LoginRequest, RefreshRequest, SignupRequest, SmsCodeRequest,
    SmsVerifyRequest, SmsVerifyResponse, TermsAgreement,
};
use crate::error::ApiError;
use crate::normalizer::normalize_detail;
use crate::request::RequestConfig;
use reqwest::Method;
use serde_json::Value;
use tracing::{info, warn};

/// Phone verification, signup, login and logout
pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn request_sms_code(&self, phone_number: &str) -> Result<Envelope, ApiError> {
        let request = SmsCodeRequest {
            phone_number: phone_number.to_string(),
        };
        self.client.post_no_auth("/auth/sms/send", &request).await
    }

    pub async fn verify_sms_code(
        &self,
        phone_number: &str,
        verification_code: &str,
    ) -> Result<Envelope<SmsVerifyResponse>, ApiError> {
        let request = SmsVerifyRequest {
            phone_number: phone_number.to_string(),
            verification_code: verification_code.to_string(),
        };
        let raw = self
            .client
            .send_json(Method::POST, "/auth/sms/verify", &request, RequestConfig::no_auth())
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    /// Create the account and keep the issued session
    pub async fn signup(&self, mut request: SignupRequest) -> Result<Envelope<AuthSession>, ApiError> {
        if request.device_id.is_none() {
            request.device_id = self.client.device_id().await;
        }
        let raw = self
            .client
            .send_json(Method::POST, "/auth/signup", &request, RequestConfig::no_auth())
            .await?;
        let envelope = normalize_detail(&raw).decode::<AuthSession>();
        self.keep_session(&envelope.data).await;
        Ok(envelope)
    }

    /// PIN login; the issued session is kept for subsequent calls
    pub async fn login(&self, phone_number: &str, pin: &str) -> Result<Envelope<AuthSession>, ApiError> {
        let request = LoginRequest {
            phone_number: phone_number.to_string(),
            pin: pin.to_string(),
            device_id: self.client.device_id().await,
        };
        let raw = self
            .client
            .send_json(Method::POST, "/auth/login", &request, RequestConfig::no_auth())
            .await?;
        let envelope = normalize_detail(&raw).decode::<AuthSession>();
        self.keep_session(&envelope.data).await;
        Ok(envelope)
    }

    /// Revoke the refresh token server-side; the local session ends either way
    pub async fn logout(&self) -> Result<Envelope, ApiError> {
        let result = match self.client.refresh_token().await {
            Some(refresh_token) => {
                let request = RefreshRequest {
                    refresh_token,
                    device_id: self.client.device_id().await,
                };
                self.client
                    .post_with_config(
                        "/auth/logout",
                        &request,
                        RequestConfig::new().no_refresh().disable_retry(),
                    )
                    .await
            }
            None => Ok(Envelope::ok(Value::Null, "로그아웃 완료")),
        };

        if let Err(err) = self.client.end_session().await {
            warn!("Failed to clear local session: {}", err);
        }
        info!("Logged out");
        result
    }

    pub async fn agree_terms(&self, agreement: &TermsAgreement) -> Result<Envelope, ApiError> {
        self.client.post("/auth/terms", agreement).await
    }

    async fn keep_session(&self, session: &AuthSession) {
        match session.tokens() {
            Some(tokens) => {
                if let Err(err) = self.client.store_session(tokens).await {
                    warn!("Failed to store session: {}", err);
                }
            }
            None => warn!("Auth response carried no access token"),
        }
    }
}
