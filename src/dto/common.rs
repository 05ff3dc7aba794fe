use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Canonical response wrapper every API call resolves to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T = Value> {
    pub success: bool,
    pub data: T,
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Pagination metadata attached to list envelopes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub has_next: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

/// Caller-supplied paging, used when the server omits it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub page: u32,
    pub limit: u32,
}

impl Default for ListParams {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl ListParams {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ]
    }
}

impl Meta {
    /// Zeroed meta for an empty list
    pub fn empty(params: &ListParams) -> Self {
        Self {
            page: params.page,
            limit: params.limit,
            total: 0,
            has_next: false,
            total_pages: None,
        }
    }
}

impl<T> Envelope<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: Some(message.into()),
            meta: None,
        }
    }

    pub fn failed(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            message: Some(message.into()),
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            success: self.success,
            data: f(self.data),
            message: self.message,
            meta: self.meta,
        }
    }
}

impl Envelope<Value> {
    /// Convert the JSON payload into a typed value.
    ///
    /// A payload that does not fit `T` degrades to `T::default()`.
    pub fn decode<T: DeserializeOwned + Default>(self) -> Envelope<T> {
        self.map(|data| {
            serde_json::from_value(data).unwrap_or_else(|err| {
                warn!("Falling back to default payload: {}", err);
                T::default()
            })
        })
    }

    /// Convert an array payload into typed items, dropping items that do not fit
    pub fn decode_items<T: DeserializeOwned>(self) -> Envelope<Vec<T>> {
        self.map(|data| match data {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match serde_json::from_value(item) {
                    Ok(parsed) => Some(parsed),
                    Err(err) => {
                        warn!("Dropping list item that failed to decode: {}", err);
                        None
                    }
                })
                .collect(),
            _ => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Deserialize)]
    struct Item {
        id: String,
    }

    #[test]
    fn test_decode_falls_back_to_default() {
        let env = Envelope::ok(json!("not an object"), "ok").decode::<Item>();
        assert!(env.success);
        assert_eq!(env.data, Item::default());
    }

    #[test]
    fn test_decode_items_drops_bad_entries() {
        let env = Envelope::ok(json!([{"id": "a"}, {"nope": 1}, {"id": "b"}]), "ok")
            .decode_items::<Item>();
        assert_eq!(
            env.data,
            vec![Item { id: "a".into() }, Item { id: "b".into() }]
        );
    }

    #[test]
    fn test_meta_skipped_when_absent() {
        let value = serde_json::to_value(Envelope::ok(json!({}), "done")).unwrap();
        assert_eq!(value, json!({"success": true, "data": {}, "message": "done"}));
    }

    #[test]
    fn test_meta_serializes_camel_case() {
        let env = Envelope::ok(json!([]), "done").with_meta(Meta::empty(&ListParams::default()));
        let value = serde_json::to_value(env).unwrap();
        assert_eq!(
            value["meta"],
            json!({"page": 1, "limit": 20, "total": 0, "hasNext": false})
        );
    }
}
