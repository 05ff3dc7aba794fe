use serde::{Deserialize, Serialize};

/// A budget slot carved out of an account balance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Slot {
    pub slot_id: String,
    pub account_id: String,
    pub name: String,
    pub budget: i64,
    pub spent: i64,
    pub remaining: i64,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAllocation {
    pub name: String,
    pub budget: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocateSlotsRequest {
    pub slots: Vec<SlotAllocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    pub transaction_id: String,
    pub account_id: String,
    pub slot_id: Option<String>,
    pub merchant_name: String,
    pub amount: i64,
    pub transaction_type: String,
    pub transacted_at: String,
}

/// One portion of a split transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitPart {
    pub slot_id: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRequest {
    pub splits: Vec<SplitPart>,
}

impl SplitRequest {
    pub fn total(&self) -> i64 {
        self.splits.iter().map(|s| s.amount).sum()
    }
}
