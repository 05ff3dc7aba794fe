use serde_json::Value;

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Omit the bearer header
    pub skip_auth: bool,
    /// Never attempt a token refresh on 401
    pub no_refresh: bool,
    /// Never apply the transient-failure retry policy
    pub disable_retry: bool,
    /// Additional or overriding headers
    pub headers: Vec<(String, String)>,
    /// Query string parameters
    pub params: Vec<(String, String)>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unauthenticated call that must not trigger a refresh either
    pub fn no_auth() -> Self {
        Self {
            skip_auth: true,
            no_refresh: true,
            ..Default::default()
        }
    }

    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    pub fn no_refresh(mut self) -> Self {
        self.no_refresh = true;
        self
    }

    pub fn disable_retry(mut self) -> Self {
        self.disable_retry = true;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// True when a caller-supplied content type marks the body as multipart
    pub fn declares_multipart(&self) -> bool {
        self.headers.iter().any(|(name, value)| {
            name.eq_ignore_ascii_case("content-type")
                && value.to_ascii_lowercase().starts_with("multipart/form-data")
        })
    }
}

/// Ephemeral state of one logical request, shared by all of its attempts
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub skip_auth: bool,
    pub no_refresh: bool,
    pub disable_retry: bool,
    /// Transient-failure retries performed so far
    pub retry_count: u32,
    /// Set once the request has been replayed after a 401
    pub auth_retried: bool,
}

impl RequestContext {
    pub fn new(config: &RequestConfig) -> Self {
        Self {
            request_id: new_request_id(),
            skip_auth: config.skip_auth,
            no_refresh: config.no_refresh,
            disable_retry: config.disable_retry,
            retry_count: 0,
            auth_retried: false,
        }
    }
}

/// Tracing token sent as `X-Request-Id`
pub fn new_request_id() -> String {
    format!(
        "{}-{:08x}",
        chrono::Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}

/// One field of a multipart upload
#[derive(Debug, Clone)]
pub enum UploadPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime_type: String,
        bytes: Vec<u8>,
    },
}

/// Multipart form kept as plain data so every attempt can rebuild it
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub parts: Vec<UploadPart>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(UploadPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(UploadPart::File {
            name: name.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        });
        self
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(UploadForm),
}

impl RequestBody {
    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart(_))
    }

    /// JSON view of the body for debug logging
    pub fn log_view(&self) -> Value {
        match self {
            RequestBody::Empty => Value::Null,
            RequestBody::Json(value) => crate::sanitizer::sanitize(value),
            RequestBody::Multipart(form) => Value::Array(
                form.parts
                    .iter()
                    .map(|part| match part {
                        UploadPart::Text { name, value } => {
                            let mut field = serde_json::Map::new();
                            field.insert(name.clone(), Value::String(value.clone()));
                            crate::sanitizer::sanitize(&Value::Object(field))
                        }
                        UploadPart::File {
                            name,
                            file_name,
                            bytes,
                            ..
                        } => serde_json::json!({
                            "field": name,
                            "file": file_name,
                            "bytes": bytes.len()
                        }),
                    })
                    .collect(),
            ),
        }
    }
}
