//! HTTP execution strategies.
//!
//! Both strategies return the status plus a best-effort JSON body; shape recovery
//! happens later in the normalizer.

use crate::error::TransportError;
use crate::request::{RequestBody, UploadForm, UploadPart};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Fully prepared request handed to a transport
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub body: RequestBody,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// Parsed JSON, the raw text as a string when it is not JSON, or `null` when empty
    pub body: Value,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    fn name(&self) -> &'static str;
}

/// Which transport strategy a client is built with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Pooled client with default headers, decoding by declared content type
    #[default]
    Client,
    /// Bare client that always reads the body as text, for backends whose bodies
    /// arrive empty or mislabelled through the pooled client
    Fetch,
}

impl std::str::FromStr for TransportMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(TransportMode::Client),
            "fetch" => Ok(TransportMode::Fetch),
            other => Err(anyhow::anyhow!("Unknown transport mode: {}", other)),
        }
    }
}

pub fn build_transport(mode: TransportMode, timeout: Duration) -> Result<Arc<dyn Transport>, TransportError> {
    Ok(match mode {
        TransportMode::Client => Arc::new(ClientTransport::new(timeout)?),
        TransportMode::Fetch => Arc::new(FetchTransport::new(timeout)?),
    })
}

pub struct ClientTransport {
    client: Client,
}

impl ClientTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .default_headers(headers)
            .user_agent(concat!("wallet-slot-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ClientTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = build(&self.client, request)?.send().await?;
        let status = response.status();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.contains("json"))
            .unwrap_or(false);
        let bytes = response.bytes().await?;

        let body = if bytes.is_empty() {
            Value::Null
        } else if is_json {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        } else {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        };

        debug!(transport = self.name(), %status, "Response received");
        Ok(HttpResponse { status, body })
    }

    fn name(&self) -> &'static str {
        "client"
    }
}

pub struct FetchTransport {
    client: Client,
    timeout: Duration,
}

impl FetchTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().pool_max_idle_per_host(0).build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Transport for FetchTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = build(&self.client, request)?
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        let text = text.trim_start_matches('\u{feff}').trim();

        // Content type is not trusted on this path
        let body = if text.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
        };

        debug!(transport = self.name(), %status, "Response received");
        Ok(HttpResponse { status, body })
    }

    fn name(&self) -> &'static str {
        "fetch"
    }
}

fn build(client: &Client, request: &HttpRequest) -> Result<RequestBuilder, TransportError> {
    let mut builder = client.request(request.method.clone(), &request.url);
    if !request.params.is_empty() {
        builder = builder.query(&request.params);
    }

    let multipart = request.body.is_multipart();
    for (name, value) in &request.headers {
        // reqwest writes the multipart boundary itself
        if multipart && name.eq_ignore_ascii_case("content-type") {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }

    Ok(match &request.body {
        RequestBody::Empty => builder,
        RequestBody::Json(value) => builder.json(value),
        RequestBody::Multipart(form) => builder.multipart(build_form(form)?),
    })
}

fn build_form(form: &UploadForm) -> Result<Form, TransportError> {
    let mut multipart = Form::new();
    for part in &form.parts {
        multipart = match part {
            UploadPart::Text { name, value } => multipart.text(name.clone(), value.clone()),
            UploadPart::File {
                name,
                file_name,
                mime_type,
                bytes,
            } => {
                let file = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime_type)
                    .map_err(|e| TransportError::Request(e.to_string()))?;
                multipart.part(name.clone(), file)
            }
        };
    }
    Ok(multipart)
}
