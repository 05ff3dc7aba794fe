use crate::api_client::ApiClient;
use crate::dto::{
    Account, AccountList, Balance, Envelope, OneWonConfirmRequest, OneWonVerificationRequest,
    OneWonVerificationTicket,
};
use crate::error::ApiError;
use crate::normalizer::{normalize_accounts, normalize_balance, normalize_detail};
use crate::request::RequestConfig;
use reqwest::Method;

pub struct AccountApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AccountApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Envelope<AccountList>, ApiError> {
        let raw = self
            .client
            .get_raw_with_fallback("/accounts", RequestConfig::default())
            .await?;
        Ok(normalize_accounts(&raw).decode())
    }

    pub async fn get(&self, account_id: &str) -> Result<Envelope<Account>, ApiError> {
        let raw = self
            .client
            .get_raw(&format!("/accounts/{}", account_id), RequestConfig::default())
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    pub async fn balance(&self, account_id: &str) -> Result<Envelope<Balance>, ApiError> {
        let raw = self
            .client
            .get_raw_with_fallback(
                &format!("/accounts/{}/balance", account_id),
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_balance(&raw).decode())
    }

    /// Deposit 1 won with a code in the memo to prove ownership of the account
    pub async fn request_one_won_verification(
        &self,
        request: &OneWonVerificationRequest,
    ) -> Result<Envelope<OneWonVerificationTicket>, ApiError> {
        let raw = self
            .client
            .send_json(
                Method::POST,
                "/accounts/verify/request",
                request,
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_detail(&raw).decode())
    }

    pub async fn confirm_one_won_verification(
        &self,
        request: &OneWonConfirmRequest,
    ) -> Result<Envelope<Account>, ApiError> {
        let raw = self
            .client
            .send_json(
                Method::POST,
                "/accounts/verify/confirm",
                request,
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_detail(&raw).decode())
    }
}
