use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub user_id: String,
    pub name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePinRequest {
    pub old_pin: String,
    pub new_pin: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MydataConsent {
    pub consented: bool,
    pub organizations: Vec<String>,
    pub consented_at: Option<String>,
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MydataConsentRequest {
    pub organizations: Vec<String>,
    pub scope: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: u32,
    pub price: i64,
}

/// Result of receipt OCR classification
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptClassification {
    pub store_name: String,
    pub amount: i64,
    pub date: String,
    pub items: Vec<ReceiptItem>,
    pub suggested_slot_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SlotSpending {
    pub slot_id: String,
    pub name: String,
    pub budget: i64,
    pub spent: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub total_income: i64,
    pub total_spending: i64,
    pub slots: Vec<SlotSpending>,
}
