use serde_json::{Map, Value};

/// Replacement for masked values
pub const MASK: &str = "****";

/// Visible prefix kept on push tokens so log lines can still be correlated
const PUSH_TOKEN_VISIBLE_CHARS: usize = 20;

const SENSITIVE_KEYS: &[&str] = &[
    "pin",
    "newPin",
    "oldPin",
    "password",
    "pushToken",
    "refreshToken",
    "verificationCode",
    "smsCode",
];

/// Return a copy of `value` that is safe to log.
///
/// Sensitive keys are masked wherever they appear in nested objects or arrays;
/// everything else keeps its original structure.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let masked: Map<String, Value> = map
                .iter()
                .map(|(key, v)| (key.clone(), sanitize_entry(key, v)))
                .collect();
            Value::Object(masked)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

fn sanitize_entry(key: &str, value: &Value) -> Value {
    if !SENSITIVE_KEYS.contains(&key) {
        return sanitize(value);
    }

    match value {
        Value::String(s) if key == "pushToken" => Value::String(mask_push_token(s)),
        Value::String(_) | Value::Number(_) => Value::String(MASK.to_string()),
        other => sanitize(other),
    }
}

fn mask_push_token(token: &str) -> String {
    if token.chars().count() <= PUSH_TOKEN_VISIBLE_CHARS {
        return MASK.to_string();
    }
    let prefix: String = token.chars().take(PUSH_TOKEN_VISIBLE_CHARS).collect();
    format!("{}{}", prefix, MASK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_masks_nested_fields() {
        let sanitized = sanitize(&json!({"pin": "1234", "nested": {"password": "x"}}));
        assert_eq!(sanitized, json!({"pin": MASK, "nested": {"password": MASK}}));
    }

    #[test]
    fn test_sanitize_twice_is_stable() {
        let once = sanitize(&json!({"pin": "1234", "nested": {"password": "x"}}));
        let twice = sanitize(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_push_token_keeps_prefix() {
        let token = "ExponentPushToken[abcdefghijklmnopqrstuvwxyz]";
        let sanitized = sanitize(&json!({ "pushToken": token }));
        assert_eq!(sanitized["pushToken"], "ExponentPushToken[ab****");
    }

    #[test]
    fn test_short_push_token_fully_masked() {
        let sanitized = sanitize(&json!({"pushToken": "short"}));
        assert_eq!(sanitized["pushToken"], MASK);
    }

    #[test]
    fn test_leaves_other_fields_untouched() {
        let input = json!({
            "phoneNumber": "01012345678",
            "amount": 15000,
            "items": [{"smsCode": "998877", "label": "a"}],
            "verified": true
        });
        let sanitized = sanitize(&input);
        assert_eq!(
            sanitized,
            json!({
                "phoneNumber": "01012345678",
                "amount": 15000,
                "items": [{"smsCode": MASK, "label": "a"}],
                "verified": true
            })
        );
    }

    #[test]
    fn test_numeric_pin_is_masked() {
        let sanitized = sanitize(&json!({"newPin": 123456, "oldPin": null}));
        assert_eq!(sanitized, json!({"newPin": MASK, "oldPin": null}));
    }

    #[test]
    fn test_non_object_values_pass_through() {
        assert_eq!(sanitize(&json!("plain")), json!("plain"));
        assert_eq!(sanitize(&Value::Null), Value::Null);
    }
}
