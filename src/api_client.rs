use crate::config::Config;
use crate::device::{DeviceIdentity, FileDeviceIdentity};
use crate::dto::{Envelope, TokenPair};
use crate::error::{ApiError, ErrorCode};
use crate::normalizer::{envelope_from_body, is_ambiguous};
use crate::refresh::{RefreshCoordinator, RefreshOutcome, RefreshState};
use crate::request::{new_request_id, RequestBody, RequestConfig, RequestContext, UploadForm};
use crate::retry::RetryPolicy;
use crate::sanitizer::sanitize;
use crate::token_store::{SessionTokenStore, TokenStore};
use crate::transport::{build_transport, FetchTransport, HttpRequest, Transport};
use anyhow::Result;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Invoked once per failed refresh cycle; the host app routes the user back to sign-in
pub type AuthFailureHook = Arc<dyn Fn() + Send + Sync>;

/// Single entry point for every backend call.
///
/// Attaches device, trace and bearer headers, replays requests once after a
/// single-flight token refresh, retries transient failures with backoff and
/// resolves every success into an [`Envelope`].
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    fallback: Option<Arc<dyn Transport>>,
    tokens: Arc<dyn TokenStore>,
    device: Arc<dyn DeviceIdentity>,
    refresh: RefreshCoordinator,
    retry_policy: RetryPolicy,
    debug: bool,
    on_auth_failure: Option<AuthFailureHook>,
}

pub struct ApiClientBuilder {
    config: Config,
    transport: Option<Arc<dyn Transport>>,
    tokens: Option<Arc<dyn TokenStore>>,
    device: Option<Arc<dyn DeviceIdentity>>,
    on_auth_failure: Option<AuthFailureHook>,
}

impl ApiClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn device_identity(mut self, device: Arc<dyn DeviceIdentity>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn on_auth_failure(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_auth_failure = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let config = self.config;
        let timeout = config.timeout();
        let base_url = config.api.base_url.trim_end_matches('/').to_string();

        let transport = match self.transport {
            Some(transport) => transport,
            None => build_transport(config.api.transport, timeout)?,
        };
        let fallback: Option<Arc<dyn Transport>> = if config.api.fallback_fetch {
            Some(Arc::new(FetchTransport::new(timeout)?))
        } else {
            None
        };
        let device = self
            .device
            .unwrap_or_else(|| Arc::new(FileDeviceIdentity::new(config.device_id_path())));
        let tokens: Arc<dyn TokenStore> = match self.tokens {
            Some(tokens) => tokens,
            None => Arc::new(SessionTokenStore::new(&base_url, timeout, device.clone())?),
        };

        info!(
            "API client ready: {} ({} transport, fallback fetch {})",
            base_url,
            transport.name(),
            if fallback.is_some() { "on" } else { "off" }
        );

        Ok(ApiClient {
            base_url,
            transport,
            fallback,
            tokens,
            device,
            refresh: RefreshCoordinator::new(),
            retry_policy: RetryPolicy::new(config.retry.clone()),
            debug: config.api.debug,
            on_auth_failure: self.on_auth_failure,
        })
    }
}

impl ApiClient {
    /// Create a client with an in-memory session and a file-backed device id
    pub fn new(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: Config) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            transport: None,
            tokens: None,
            device: None,
            on_auth_failure: None,
        }
    }

    /// Create a client whose session survives restarts under `storage.data_dir`
    pub async fn open(config: Config) -> Result<Self> {
        let device: Arc<dyn DeviceIdentity> =
            Arc::new(FileDeviceIdentity::new(config.device_id_path()));
        let tokens = SessionTokenStore::open(
            config.session_path(),
            &config.api.base_url,
            config.timeout(),
            device.clone(),
        )
        .await?;

        Self::builder(config)
            .device_identity(device)
            .token_store(Arc::new(tokens))
            .build()
    }

    // ========================================================================
    // Request Surface
    // ========================================================================

    pub async fn get(&self, url: &str, config: RequestConfig) -> Result<Envelope, ApiError> {
        let body = self.execute(Method::GET, url, RequestBody::Empty, config).await?;
        Ok(envelope_from_body(&body))
    }

    pub async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Envelope, ApiError> {
        self.post_with_config(url, body, RequestConfig::default()).await
    }

    pub async fn post_with_config<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        config: RequestConfig,
    ) -> Result<Envelope, ApiError> {
        let body = self.execute(Method::POST, url, json_body(body)?, config).await?;
        Ok(envelope_from_body(&body))
    }

    /// POST without bearer header and without refresh on 401 (signup, login, SMS)
    pub async fn post_no_auth<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Envelope, ApiError> {
        self.post_with_config(url, body, RequestConfig::no_auth()).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        config: RequestConfig,
    ) -> Result<Envelope, ApiError> {
        let body = self.execute(Method::PUT, url, json_body(body)?, config).await?;
        Ok(envelope_from_body(&body))
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
        config: RequestConfig,
    ) -> Result<Envelope, ApiError> {
        let body = self.execute(Method::PATCH, url, json_body(body)?, config).await?;
        Ok(envelope_from_body(&body))
    }

    pub async fn delete(&self, url: &str, config: RequestConfig) -> Result<Envelope, ApiError> {
        let body = self.execute(Method::DELETE, url, RequestBody::Empty, config).await?;
        Ok(envelope_from_body(&body))
    }

    /// Multipart upload; never retried for transient failures
    pub async fn upload(
        &self,
        url: &str,
        form: UploadForm,
        config: RequestConfig,
    ) -> Result<Envelope, ApiError> {
        let body = self
            .execute(Method::POST, url, RequestBody::Multipart(form), config)
            .await?;
        Ok(envelope_from_body(&body))
    }

    // ========================================================================
    // Session
    // ========================================================================

    pub async fn store_session(&self, tokens: TokenPair) -> Result<()> {
        self.tokens.set_tokens(tokens).await
    }

    pub async fn end_session(&self) -> Result<()> {
        self.tokens.clear().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.access_token().await.is_some()
    }

    /// Device identifier, or `None` when storage is unavailable
    pub async fn device_id(&self) -> Option<String> {
        match self.device.get_or_create().await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!("Device id unavailable: {}", err);
                None
            }
        }
    }

    pub(crate) async fn refresh_token(&self) -> Option<String> {
        self.tokens.refresh_token().await
    }

    pub fn refresh_state(&self) -> RefreshState {
        self.refresh.state()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ========================================================================
    // Raw Access For Domain Modules
    // ========================================================================

    /// Run the full pipeline and return the decoded body without wrapping it
    pub(crate) async fn request_raw(
        &self,
        method: Method,
        url: &str,
        body: RequestBody,
        config: RequestConfig,
    ) -> Result<Value, ApiError> {
        self.execute(method, url, body, config).await
    }

    pub(crate) async fn get_raw(&self, url: &str, config: RequestConfig) -> Result<Value, ApiError> {
        self.execute(Method::GET, url, RequestBody::Empty, config).await
    }

    pub(crate) async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: &B,
        config: RequestConfig,
    ) -> Result<Value, ApiError> {
        self.execute(method, url, json_body(body)?, config).await
    }

    /// GET that re-reads an ambiguous body once through the fetch transport
    pub(crate) async fn get_raw_with_fallback(
        &self,
        url: &str,
        config: RequestConfig,
    ) -> Result<Value, ApiError> {
        let primary = self
            .execute(Method::GET, url, RequestBody::Empty, config.clone())
            .await?;
        if !is_ambiguous(&primary) {
            return Ok(primary);
        }

        match self.fallback_fetch(url, &config).await {
            Some(recovered) if !is_ambiguous(&recovered) => {
                debug!("Recovered ambiguous body for {} via fallback fetch", url);
                Ok(recovered)
            }
            _ => Ok(primary),
        }
    }

    /// One direct GET through the fetch transport.
    ///
    /// No retry and no refresh; any failure yields `None` so the caller keeps
    /// whatever it already had.
    pub async fn fallback_fetch(&self, url: &str, config: &RequestConfig) -> Option<Value> {
        let fallback = self.fallback.as_ref()?;
        let ctx = RequestContext::new(config);
        let device_id = self.device_id().await;
        let (request, _) = self
            .prepare(Method::GET, url, &RequestBody::Empty, config, &ctx, device_id.as_deref())
            .await;

        match fallback.execute(&request).await {
            Ok(response) if response.status.is_success() => Some(response.body),
            Ok(response) => {
                debug!(request_id = %ctx.request_id, status = %response.status, "Fallback fetch rejected");
                None
            }
            Err(err) => {
                debug!(request_id = %ctx.request_id, "Fallback fetch failed: {}", err);
                None
            }
        }
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: RequestBody,
        config: RequestConfig,
    ) -> Result<Value, ApiError> {
        let mut ctx = RequestContext::new(&config);
        let multipart = body.is_multipart() || config.declares_multipart();
        let device_id = self.device_id().await;

        loop {
            let (request, sent_token) = self
                .prepare(method.clone(), url, &body, &config, &ctx, device_id.as_deref())
                .await;

            if self.debug {
                debug!(
                    request_id = %ctx.request_id,
                    "→ {} {} {}",
                    request.method,
                    request.url,
                    body.log_view()
                );
            }

            let err = match self.transport.execute(&request).await {
                Ok(response) if response.status.is_success() => {
                    if self.debug {
                        debug!(
                            request_id = %ctx.request_id,
                            "← {} {}",
                            response.status,
                            sanitize(&response.body)
                        );
                    }
                    return Ok(response.body);
                }
                Ok(response) if response.status == StatusCode::UNAUTHORIZED => {
                    if self.can_refresh(&ctx).await {
                        ctx.auth_retried = true;
                        match self.refresh.refresh(self.tokens.as_ref(), sent_token.as_deref()).await {
                            RefreshOutcome::Refreshed(_) => {
                                debug!(request_id = %ctx.request_id, "Replaying request with refreshed token");
                                continue;
                            }
                            RefreshOutcome::Failed { leader } => {
                                if leader {
                                    self.handle_refresh_failure().await;
                                }
                            }
                        }
                    }
                    ApiError::from_status(response.status, &response.body, &ctx.request_id)
                }
                Ok(response) => {
                    ApiError::from_status(response.status, &response.body, &ctx.request_id)
                }
                Err(err) => ApiError::from_transport(err, &ctx.request_id),
            };

            if !ctx.disable_retry
                && !multipart
                && self.retry_policy.should_retry(&err, ctx.retry_count)
            {
                ctx.retry_count += 1;
                let delay = self.retry_policy.delay_for(ctx.retry_count);
                warn!(
                    request_id = %ctx.request_id,
                    "Attempt {} failed: {}. Retrying in {:?}...",
                    ctx.retry_count,
                    err,
                    delay
                );
                sleep(delay).await;
                continue;
            }

            if ctx.retry_count > 0 {
                warn!(
                    request_id = %ctx.request_id,
                    "Request failed after {} attempts: {}",
                    ctx.retry_count + 1,
                    err
                );
            } else {
                debug!(request_id = %ctx.request_id, "Request failed: {}", err);
            }
            return Err(err);
        }
    }

    /// Build the outgoing request; also returns the bearer token it carries
    async fn prepare(
        &self,
        method: Method,
        url: &str,
        body: &RequestBody,
        config: &RequestConfig,
        ctx: &RequestContext,
        device_id: Option<&str>,
    ) -> (HttpRequest, Option<String>) {
        let mut headers: Vec<(String, String)> = Vec::with_capacity(4 + config.headers.len());
        headers.push(("X-Request-Id".to_string(), ctx.request_id.clone()));
        if let Some(id) = device_id {
            headers.push(("X-Device-Id".to_string(), id.to_string()));
        }

        let token = if ctx.skip_auth {
            None
        } else {
            self.tokens.access_token().await
        };
        if let Some(token) = &token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        if !body.is_multipart() && !config.declares_multipart() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        for (name, value) in &config.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        let request = HttpRequest {
            method,
            url: self.resolve_url(url),
            headers,
            params: config.params.clone(),
            body: body.clone(),
        };
        (request, token)
    }

    async fn can_refresh(&self, ctx: &RequestContext) -> bool {
        if ctx.no_refresh || ctx.auth_retried {
            return false;
        }
        self.tokens.refresh_token().await.is_some()
    }

    async fn handle_refresh_failure(&self) {
        warn!("Token refresh failed, ending session");
        if let Err(err) = self.tokens.clear().await {
            warn!("Failed to clear session: {}", err);
        }
        if let Some(hook) = &self.on_auth_failure {
            hook();
        }
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

fn json_body<B: Serialize + ?Sized>(body: &B) -> Result<RequestBody, ApiError> {
    serde_json::to_value(body)
        .map(RequestBody::Json)
        .map_err(|e| {
            ApiError::new(
                ErrorCode::Request,
                format!("Failed to serialize body: {}", e),
                &new_request_id(),
            )
        })
}
