#![allow(dead_code)]

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use wallet_slot_client::device::StaticDeviceIdentity;
use wallet_slot_client::error::TransportError;
use wallet_slot_client::transport::{HttpRequest, HttpResponse, Transport};
use wallet_slot_client::{ApiClient, ApiClientBuilder, Config};

pub const DEVICE_ID: &str = "device-test-1";

/// Config pointed at a mock server with near-zero retry delays
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::with_base_url(base_url);
    config.api.fallback_fetch = false;
    config.retry.base_delay_ms = 1;
    config.retry.max_jitter_ms = 0;
    config
}

pub fn builder(config: Config) -> ApiClientBuilder {
    ApiClient::builder(config).device_identity(Arc::new(StaticDeviceIdentity(DEVICE_ID.to_string())))
}

pub fn client(base_url: &str) -> ApiClient {
    builder(test_config(base_url)).build().unwrap()
}

type Responder = Box<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

/// Transport that answers from a closure and records every request
pub struct ScriptedTransport {
    responder: Responder,
    calls: AtomicU32,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        responder: impl Fn(&HttpRequest) -> Result<HttpResponse, TransportError>
            + Send
            + Sync
            + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            responder: Box::new(responder),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(body: Value) -> Arc<Self> {
        Self::new(move |_| {
            Ok(HttpResponse {
                status: StatusCode::OK,
                body: body.clone(),
            })
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        (self.responder)(request)
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
