//! Classified errors surfaced by [`ApiClient`](crate::ApiClient).
//!
//! Every failure that reaches a caller carries a stable code, a human readable
//! message and the `request_id` of the call that produced it.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error code classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Server responded with a non-2xx status
    Http(u16),
    /// Request was sent but no response arrived (offline, timeout, DNS)
    Network,
    /// Request could not be built or sent at all
    Request,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::Http(status) => write!(f, "HTTP_{}", status),
            ErrorCode::Network => f.write_str("NETWORK_ERROR"),
            ErrorCode::Request => f.write_str("REQUEST_ERROR"),
        }
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Error, Serialize)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub details: ErrorDetails,
}

/// Failures raised by a [`Transport`](crate::transport::Transport) before any response exists
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request could not be sent: {0}")]
    Request(String),

    #[error("no response received: {0}")]
    Network(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            TransportError::Request(err.to_string())
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>, request_id: &str) -> Self {
        Self {
            code,
            message: message.into(),
            details: ErrorDetails {
                request_id: request_id.to_string(),
                status: None,
                body: None,
            },
        }
    }

    /// Build an `HTTP_<status>` error, pulling the message out of a JSON error body
    pub fn from_status(status: StatusCode, body: &Value, request_id: &str) -> Self {
        let message = ["message", "error", "detail"]
            .iter()
            .find_map(|key| body.get(key).and_then(Value::as_str))
            .or_else(|| body.as_str().filter(|s| !s.trim().is_empty()))
            .map(str::to_string)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unexpected status")
                    .to_string()
            });

        Self {
            code: ErrorCode::Http(status.as_u16()),
            message,
            details: ErrorDetails {
                request_id: request_id.to_string(),
                status: Some(status.as_u16()),
                body: (!body.is_null()).then(|| body.clone()),
            },
        }
    }

    pub fn from_transport(err: TransportError, request_id: &str) -> Self {
        match err {
            TransportError::Request(msg) => Self::new(ErrorCode::Request, msg, request_id),
            TransportError::Network(msg) => Self::new(ErrorCode::Network, msg, request_id),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self.code {
            ErrorCode::Http(status) => Some(status),
            _ => None,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.details.request_id
    }

    /// Network failures, 429 and 5xx may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self.code {
            ErrorCode::Network => true,
            ErrorCode::Http(status) => status == 429 || (500..=599).contains(&status),
            ErrorCode::Request => false,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code == ErrorCode::Http(401)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::Http(503).to_string(), "HTTP_503");
        assert_eq!(ErrorCode::Network.to_string(), "NETWORK_ERROR");
        assert_eq!(ErrorCode::Request.to_string(), "REQUEST_ERROR");
    }

    #[test]
    fn test_from_status_uses_body_message() {
        let body = json!({"success": false, "message": "잘못된 요청입니다."});
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, &body, "req-1");

        assert_eq!(err.code, ErrorCode::Http(400));
        assert_eq!(err.message, "잘못된 요청입니다.");
        assert_eq!(err.details.status, Some(400));
        assert_eq!(err.request_id(), "req-1");
        assert_eq!(err.details.body, Some(body));
    }

    #[test]
    fn test_from_status_without_body_falls_back_to_reason() {
        let err = ApiError::from_status(StatusCode::SERVICE_UNAVAILABLE, &Value::Null, "req-2");
        assert_eq!(err.message, "Service Unavailable");
        assert!(err.details.body.is_none());
    }

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::new(ErrorCode::Network, "offline", "r").is_transient());
        assert!(ApiError::new(ErrorCode::Http(429), "slow down", "r").is_transient());
        assert!(ApiError::new(ErrorCode::Http(502), "bad gateway", "r").is_transient());
        assert!(!ApiError::new(ErrorCode::Http(404), "missing", "r").is_transient());
        assert!(!ApiError::new(ErrorCode::Http(401), "auth", "r").is_transient());
        assert!(!ApiError::new(ErrorCode::Request, "bad url", "r").is_transient());
    }

    #[test]
    fn test_serializes_code_as_string() {
        let err = ApiError::new(ErrorCode::Http(401), "unauthorized", "req-9");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["code"], "HTTP_401");
        assert_eq!(value["details"]["requestId"], "req-9");
    }
}
