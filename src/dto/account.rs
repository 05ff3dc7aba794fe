use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Account {
    pub account_id: String,
    pub bank_code: String,
    pub bank_name: String,
    pub account_number: String,
    pub account_alias: Option<String>,
    pub balance: i64,
    pub is_primary: bool,
}

/// Payload of the account list endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountList {
    pub accounts: Vec<Account>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Balance {
    pub balance: i64,
}

/// Starts a 1-won deposit verification against the given bank account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneWonVerificationRequest {
    pub bank_code: String,
    pub account_number: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OneWonVerificationTicket {
    pub verification_id: String,
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneWonConfirmRequest {
    pub verification_id: String,
    pub verification_code: String,
}
