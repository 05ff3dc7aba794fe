//! Response shape recovery.
//!
//! Backend, mock and fallback-fetch paths disagree on how they wrap payloads. The
//! functions here classify a raw body into a closed set of shapes and rebuild the
//! canonical [`Envelope`] for each resource family. None of them fail: anything
//! unrecognisable degrades to an empty but well-typed payload.

use crate::dto::{Envelope, ListParams, Meta};
use serde_json::{json, Map, Value};

/// Resource family a payload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Accounts,
    Balance,
    Slots,
    Transactions,
    Notifications,
    /// Single object endpoints (account detail, slot detail, profile, ...)
    Detail,
    /// Any other list endpoint
    List,
}

impl ResourceKind {
    /// Key under which the backend sometimes nests the list inside `data`
    pub fn collection_key(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Accounts => Some("accounts"),
            ResourceKind::Slots => Some("slots"),
            ResourceKind::Transactions => Some("transactions"),
            ResourceKind::Notifications => Some("notifications"),
            ResourceKind::Balance | ResourceKind::Detail | ResourceKind::List => None,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ResourceKind::Accounts => "계좌 목록 조회 완료",
            ResourceKind::Balance => "잔액 조회 완료",
            ResourceKind::Slots => "슬롯 목록 조회 완료",
            ResourceKind::Transactions => "거래 내역 조회 완료",
            ResourceKind::Notifications => "알림 목록 조회 완료",
            ResourceKind::Detail => "조회 완료",
            ResourceKind::List => "목록 조회 완료",
        }
    }
}

/// Closed set of list payload shapes
#[derive(Debug, Clone, PartialEq)]
pub enum ListShape {
    /// `{data: [...], pagination|meta: {...}}`
    ListWithMeta {
        items: Vec<Value>,
        pagination: Map<String, Value>,
    },
    /// `{data: [...]}` without paging information
    ListWithData { items: Vec<Value> },
    /// `[...]`
    BareArray(Vec<Value>),
    /// Empty string, `null`, `{}` or anything else without a list in it
    Ambiguous,
}

/// Parse string bodies and filter out ambiguous ones.
///
/// Returns `None` for `null`, blank or unparseable strings and objects with no keys.
pub fn resolve_body(raw: &Value) -> Option<Value> {
    match raw {
        Value::Null => None,
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            match serde_json::from_str::<Value>(text) {
                Ok(Value::String(_)) | Err(_) => None,
                Ok(parsed) => resolve_body(&parsed),
            }
        }
        Value::Object(map) if map.is_empty() => None,
        other => Some(other.clone()),
    }
}

pub fn is_ambiguous(raw: &Value) -> bool {
    resolve_body(raw).is_none()
}

/// Classify a list payload, looking for the list under `data`, `data.<key>` or `<key>`
pub fn classify_list(raw: &Value, collection_key: Option<&str>) -> ListShape {
    let body = match resolve_body(raw) {
        Some(body) => body,
        None => return ListShape::Ambiguous,
    };

    let obj = match body {
        Value::Array(items) => return ListShape::BareArray(items),
        Value::Object(obj) => obj,
        _ => return ListShape::Ambiguous,
    };

    let data = obj.get("data");
    let nested = data.and_then(Value::as_object);

    let items = data
        .and_then(Value::as_array)
        .or_else(|| {
            let key = collection_key?;
            nested
                .and_then(|n| n.get(key))
                .or_else(|| obj.get(key))
                .and_then(Value::as_array)
        })
        .cloned();

    let Some(items) = items else {
        return ListShape::Ambiguous;
    };

    let pagination = nested
        .and_then(|n| n.get("pagination").or_else(|| n.get("meta")))
        .or_else(|| obj.get("pagination"))
        .or_else(|| obj.get("meta"))
        .and_then(Value::as_object)
        .cloned();

    match pagination {
        Some(pagination) => ListShape::ListWithMeta { items, pagination },
        None => ListShape::ListWithData { items },
    }
}

/// Normalize `raw` for the given resource family
pub fn normalize(raw: &Value, kind: ResourceKind, params: Option<&ListParams>) -> Envelope<Value> {
    match kind {
        ResourceKind::Accounts => normalize_accounts(raw),
        ResourceKind::Balance => normalize_balance(raw),
        ResourceKind::Detail => normalize_detail(raw),
        ResourceKind::Slots
        | ResourceKind::Transactions
        | ResourceKind::Notifications
        | ResourceKind::List => normalize_list(raw, kind, params),
    }
}

pub fn normalize_list(
    raw: &Value,
    kind: ResourceKind,
    params: Option<&ListParams>,
) -> Envelope<Value> {
    let params = params.copied().unwrap_or_default();
    let (success, message) = header(raw, kind);

    let (items, meta) = match classify_list(raw, kind.collection_key()) {
        ListShape::ListWithMeta { items, pagination } => {
            let meta = meta_from_pagination(&pagination, items.len(), &params);
            (items, meta)
        }
        ListShape::ListWithData { items } | ListShape::BareArray(items) => {
            let meta = Meta {
                page: params.page,
                limit: params.limit,
                total: items.len() as u64,
                has_next: false,
                total_pages: None,
            };
            (items, meta)
        }
        ListShape::Ambiguous => (Vec::new(), Meta::empty(&params)),
    };

    Envelope {
        success,
        data: Value::Array(items),
        message: Some(message),
        meta: Some(meta),
    }
}

/// Account list payload is always `{accounts: [...]}`
pub fn normalize_accounts(raw: &Value) -> Envelope<Value> {
    let (success, message) = header(raw, ResourceKind::Accounts);
    let accounts = match classify_list(raw, ResourceKind::Accounts.collection_key()) {
        ListShape::ListWithMeta { items, .. }
        | ListShape::ListWithData { items }
        | ListShape::BareArray(items) => items,
        ListShape::Ambiguous => Vec::new(),
    };

    Envelope {
        success,
        data: json!({ "accounts": accounts }),
        message: Some(message),
        meta: None,
    }
}

/// Balance is read from `data.balance`, then `balance`, else zero
pub fn normalize_balance(raw: &Value) -> Envelope<Value> {
    let (success, message) = header(raw, ResourceKind::Balance);
    let body = resolve_body(raw).unwrap_or(Value::Null);

    let balance = body
        .get("data")
        .and_then(|d| d.get("balance"))
        .and_then(as_amount)
        .or_else(|| body.get("balance").and_then(as_amount))
        .unwrap_or(0);

    Envelope {
        success,
        data: json!({ "balance": balance }),
        message: Some(message),
        meta: None,
    }
}

/// Single object payloads; missing or non-object data becomes `{}`
pub fn normalize_detail(raw: &Value) -> Envelope<Value> {
    let (success, message) = header(raw, ResourceKind::Detail);

    let data = match resolve_body(raw) {
        Some(Value::Object(obj)) => match obj.get("data").cloned() {
            Some(Value::Object(inner)) => Value::Object(inner),
            Some(_) => Value::Object(Map::new()),
            None => {
                let rest: Map<String, Value> = obj
                    .into_iter()
                    .filter(|(k, _)| k != "success" && k != "message")
                    .collect();
                Value::Object(rest)
            }
        },
        _ => Value::Object(Map::new()),
    };

    Envelope {
        success,
        data,
        message: Some(message),
        meta: None,
    }
}

/// Wrap an arbitrary response body into an envelope without resource knowledge.
///
/// Bodies that already carry `success` and `data` pass through; anything else is
/// wrapped as `{success: true, data: body}`. Ambiguous bodies yield `data: null`.
pub fn envelope_from_body(raw: &Value) -> Envelope<Value> {
    let body = match resolve_body(raw) {
        Some(body) => body,
        None => {
            return Envelope {
                success: true,
                data: Value::Null,
                message: None,
                meta: None,
            }
        }
    };

    if let Some(obj) = body.as_object() {
        if obj.contains_key("success") && obj.contains_key("data") {
            let data = obj.get("data").cloned().unwrap_or(Value::Null);
            let item_count = data.as_array().map(Vec::len).unwrap_or(0);
            let meta = obj
                .get("meta")
                .or_else(|| obj.get("pagination"))
                .and_then(Value::as_object)
                .map(|p| meta_from_pagination(p, item_count, &ListParams::default()));

            return Envelope {
                success: obj.get("success").and_then(as_flag).unwrap_or(true),
                data,
                message: obj.get("message").and_then(Value::as_str).map(str::to_string),
                meta,
            };
        }
    }

    Envelope {
        success: true,
        data: body,
        message: None,
        meta: None,
    }
}

fn header(raw: &Value, kind: ResourceKind) -> (bool, String) {
    let body = resolve_body(raw);
    let obj = body.as_ref().and_then(Value::as_object);

    let success = obj
        .and_then(|o| o.get("success"))
        .and_then(as_flag)
        .unwrap_or(true);
    let message = obj
        .and_then(|o| o.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| kind.default_message().to_string());

    (success, message)
}

fn meta_from_pagination(pagination: &Map<String, Value>, item_count: usize, params: &ListParams) -> Meta {
    let field = |keys: &[&str]| keys.iter().find_map(|k| pagination.get(*k));

    let page = field(&["currentPage", "page"])
        .and_then(as_page_value)
        .unwrap_or(params.page);
    let limit = field(&["limit", "pageSize", "itemsPerPage"])
        .and_then(as_page_value)
        .unwrap_or(params.limit);
    let total = field(&["totalItems", "total", "totalCount"])
        .and_then(as_count)
        .unwrap_or(item_count as u64);
    let total_pages = field(&["totalPages"]).and_then(as_page_value);

    let has_next = field(&["hasNextPage", "hasNext"])
        .and_then(as_flag)
        .unwrap_or_else(|| match total_pages {
            Some(pages) => page < pages,
            None => u64::from(page) * u64::from(limit) < total,
        });

    Meta {
        page,
        limit,
        total,
        has_next,
        total_pages,
    }
}

fn as_amount(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f.round() as i64))
}

fn as_count(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Counts that do not fit a `u32` are treated as absent
fn as_page_value(value: &Value) -> Option<u32> {
    as_count(value).and_then(|v| u32::try_from(v).ok())
}

fn as_flag(value: &Value) -> Option<bool> {
    value.as_bool().or_else(|| match value.as_str() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_classify_shapes() {
        assert_eq!(
            classify_list(&json!([1, 2]), None),
            ListShape::BareArray(vec![json!(1), json!(2)])
        );
        assert_eq!(
            classify_list(&json!({"data": [1]}), None),
            ListShape::ListWithData { items: vec![json!(1)] }
        );
        assert!(matches!(
            classify_list(&json!({"data": [1], "pagination": {"page": 1}}), None),
            ListShape::ListWithMeta { .. }
        ));
        assert_eq!(classify_list(&json!(""), None), ListShape::Ambiguous);
        assert_eq!(classify_list(&json!({}), None), ListShape::Ambiguous);
        assert_eq!(classify_list(&Value::Null, None), ListShape::Ambiguous);
        assert_eq!(classify_list(&json!({"data": {}}), None), ListShape::Ambiguous);
    }

    #[test]
    fn test_classify_nested_collection() {
        let raw = json!({
            "success": true,
            "data": {"slots": [{"slotId": "s1"}], "pagination": {"total": 1}}
        });
        match classify_list(&raw, Some("slots")) {
            ListShape::ListWithMeta { items, pagination } => {
                assert_eq!(items.len(), 1);
                assert_eq!(pagination.get("total"), Some(&json!(1)));
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_string_body() {
        assert_eq!(resolve_body(&json!("  ")), None);
        assert_eq!(resolve_body(&json!("not json")), None);
        assert_eq!(resolve_body(&json!("{}")), None);
        assert_eq!(resolve_body(&json!("\"quoted\"")), None);
        assert_eq!(resolve_body(&json!("[1]")), Some(json!([1])));
    }

    #[test]
    fn test_pagination_mapping() {
        let raw = json!({
            "data": [{"id": 1}, {"id": 2}],
            "pagination": {"currentPage": 3, "totalItems": 45, "hasNextPage": true, "totalPages": 5}
        });
        let env = normalize_list(&raw, ResourceKind::List, Some(&ListParams::new(1, 10)));
        assert_eq!(
            env.meta,
            Some(Meta {
                page: 3,
                limit: 10,
                total: 45,
                has_next: true,
                total_pages: Some(5),
            })
        );
    }

    #[test]
    fn test_has_next_derived_from_total_pages() {
        let raw = json!({"data": [], "meta": {"page": 2, "limit": 10, "total": 30, "totalPages": 3}});
        let meta = normalize_list(&raw, ResourceKind::List, None).meta.unwrap();
        assert!(meta.has_next);

        let raw = json!({"data": [], "meta": {"page": 3, "limit": 10, "total": 30}});
        let meta = normalize_list(&raw, ResourceKind::List, None).meta.unwrap();
        assert!(!meta.has_next);
    }

    #[test]
    fn test_out_of_range_paging_falls_back_to_params() {
        let raw = json!({
            "data": [{"id": 1}],
            "pagination": {"page": 5_000_000_000u64, "limit": 4_294_967_296u64, "total": 100, "totalPages": 10_000_000_000u64}
        });
        let meta = normalize_list(&raw, ResourceKind::List, Some(&ListParams::new(2, 15)))
            .meta
            .unwrap();
        assert_eq!((meta.page, meta.limit, meta.total), (2, 15, 100));
        assert_eq!(meta.total_pages, None);
        assert!(meta.has_next);
    }

    #[test]
    fn test_balance_priority() {
        let env = normalize_balance(&json!({"data": {"balance": 5000}, "balance": 1}));
        assert_eq!(env.data, json!({"balance": 5000}));

        let env = normalize_balance(&json!({"balance": 1200.4}));
        assert_eq!(env.data, json!({"balance": 1200}));

        let env = normalize_balance(&json!({"data": {"balance": "oops"}}));
        assert_eq!(env.data, json!({"balance": 0}));

        let env = normalize_balance(&json!(""));
        assert_eq!(env.data, json!({"balance": 0}));
        assert_eq!(env.message.as_deref(), Some("잔액 조회 완료"));
    }

    #[test]
    fn test_detail_shapes() {
        assert_eq!(
            normalize_detail(&json!({"success": true, "data": {"slotId": "s1"}})).data,
            json!({"slotId": "s1"})
        );
        assert_eq!(
            normalize_detail(&json!({"slotId": "s1", "message": "ok"})).data,
            json!({"slotId": "s1"})
        );
        assert_eq!(normalize_detail(&json!({"data": null})).data, json!({}));
        assert_eq!(normalize_detail(&json!([1, 2])).data, json!({}));
    }

    #[test]
    fn test_envelope_passthrough() {
        let env = envelope_from_body(&json!({"success": false, "data": null, "message": "no"}));
        assert!(!env.success);
        assert_eq!(env.message.as_deref(), Some("no"));
        assert_eq!(env.data, Value::Null);
    }

    #[test]
    fn test_envelope_wraps_plain_values() {
        let env = envelope_from_body(&json!({"userId": "u1"}));
        assert!(env.success);
        assert_eq!(env.data, json!({"userId": "u1"}));
        assert!(env.message.is_none());

        let env = envelope_from_body(&json!("{\"success\":true,\"data\":[1]}"));
        assert_eq!(env.data, json!([1]));
    }

    #[test]
    fn test_envelope_for_ambiguous_body() {
        for raw in [json!(""), json!({}), Value::Null] {
            let env = envelope_from_body(&raw);
            assert!(env.success);
            assert_eq!(env.data, Value::Null);
        }
    }

    #[test]
    fn test_success_flag_is_carried() {
        let env = normalize_list(&json!({"success": false, "data": []}), ResourceKind::Slots, None);
        assert!(!env.success);
        assert_eq!(env.message.as_deref(), Some("슬롯 목록 조회 완료"));
    }
}
