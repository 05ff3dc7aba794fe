use crate::device::DeviceIdentity;
use crate::dto::{RefreshRequest, TokenPair};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Holder of the access/refresh token pair.
///
/// Only the single-flight refresh path writes a new pair during normal operation;
/// everything else reads.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn access_token(&self) -> Option<String>;

    async fn refresh_token(&self) -> Option<String>;

    async fn set_tokens(&self, tokens: TokenPair) -> Result<()>;

    async fn clear(&self) -> Result<()>;

    /// Exchange the refresh token for a new access token and persist the result.
    ///
    /// `None` means the refresh failed.
    async fn refresh_access_token(&self) -> Option<String>;
}

/// Token store backed by memory and an optional JSON session file, refreshing
/// through `POST /auth/refresh`
pub struct SessionTokenStore {
    tokens: RwLock<Option<TokenPair>>,
    path: Option<PathBuf>,
    http: Client,
    refresh_url: String,
    device: Arc<dyn DeviceIdentity>,
}

impl SessionTokenStore {
    /// In-memory store
    pub fn new(base_url: &str, timeout: Duration, device: Arc<dyn DeviceIdentity>) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            tokens: RwLock::new(None),
            path: None,
            http,
            refresh_url: format!("{}/auth/refresh", base_url.trim_end_matches('/')),
            device,
        })
    }

    /// Store persisted to `path`, loading any session saved there
    pub async fn open(
        path: impl Into<PathBuf>,
        base_url: &str,
        timeout: Duration,
        device: Arc<dyn DeviceIdentity>,
    ) -> Result<Self> {
        let path = path.into();
        let mut store = Self::new(base_url, timeout, device)?;

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<TokenPair>(&contents) {
                Ok(pair) => {
                    debug!("Restored session from {}", path.display());
                    store.tokens = RwLock::new(Some(pair));
                }
                Err(err) => warn!("Ignoring unreadable session file {}: {}", path.display(), err),
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        store.path = Some(path);
        Ok(store)
    }

    async fn persist(&self, tokens: Option<&TokenPair>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        match tokens {
            Some(pair) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(path, serde_json::to_vec(pair)?).await?;
            }
            None => match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            },
        }
        Ok(())
    }

    async fn request_refresh(&self, refresh_token: String) -> Result<TokenPair> {
        let device_id = match self.device.get_or_create().await {
            Ok(id) => Some(id),
            Err(err) => {
                warn!("Refreshing without device id: {}", err);
                None
            }
        };

        let mut request = self.http.post(&self.refresh_url).json(&RefreshRequest {
            refresh_token: refresh_token.clone(),
            device_id: device_id.clone(),
        });
        if let Some(id) = device_id {
            request = request.header("X-Device-Id", id);
        }

        let response = request
            .header("X-Request-Id", crate::request::new_request_id())
            .send()
            .await?;
        let status = response.status();
        let body: Value = serde_json::from_str(&response.text().await?).unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(anyhow::anyhow!("Refresh rejected with status {}", status));
        }

        let field = |key: &str| {
            body.get("data")
                .and_then(|d| d.get(key))
                .or_else(|| body.get(key))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let access_token = field("accessToken")
            .ok_or_else(|| anyhow::anyhow!("No access token in refresh response"))?;

        Ok(TokenPair {
            access_token,
            refresh_token: field("refreshToken").unwrap_or(refresh_token),
        })
    }
}

#[async_trait]
impl TokenStore for SessionTokenStore {
    async fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
            .filter(|t| !t.is_empty())
    }

    async fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.refresh_token.clone())
            .filter(|t| !t.is_empty())
    }

    async fn set_tokens(&self, tokens: TokenPair) -> Result<()> {
        let result = self.persist(Some(&tokens)).await;
        *self.tokens.write().await = Some(tokens);
        result
    }

    async fn clear(&self) -> Result<()> {
        *self.tokens.write().await = None;
        self.persist(None).await
    }

    async fn refresh_access_token(&self) -> Option<String> {
        let refresh_token = self.refresh_token().await?;

        match self.request_refresh(refresh_token).await {
            Ok(pair) => {
                let access_token = pair.access_token.clone();
                if let Err(err) = self.set_tokens(pair).await {
                    warn!("Refreshed tokens could not be persisted: {}", err);
                }
                info!("Access token refreshed");
                Some(access_token)
            }
            Err(err) => {
                warn!("Token refresh failed: {}", err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::StaticDeviceIdentity;
    use mockito::Matcher;
    use serde_json::json;
    use tempfile::tempdir;

    fn device() -> Arc<dyn DeviceIdentity> {
        Arc::new(StaticDeviceIdentity("device-1".to_string()))
    }

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    #[tokio::test]
    async fn test_refresh_reads_nested_token_and_rotates() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/refresh")
            .match_header("x-device-id", "device-1")
            .match_body(Matcher::Json(json!({"refreshToken": "r1", "deviceId": "device-1"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"data":{"accessToken":"a2","refreshToken":"r2"}}"#)
            .create_async()
            .await;

        let store = SessionTokenStore::new(&server.url(), Duration::from_secs(5), device()).unwrap();
        store.set_tokens(pair("a1", "r1")).await.unwrap();

        assert_eq!(store.refresh_access_token().await.as_deref(), Some("a2"));
        assert_eq!(store.access_token().await.as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("r2"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_refresh_top_level_token_keeps_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/refresh")
            .with_status(200)
            .with_body(r#"{"accessToken":"a2"}"#)
            .create_async()
            .await;

        let store = SessionTokenStore::new(&server.url(), Duration::from_secs(5), device()).unwrap();
        store.set_tokens(pair("a1", "r1")).await.unwrap();

        assert_eq!(store.refresh_access_token().await.as_deref(), Some("a2"));
        assert_eq!(store.refresh_token().await.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_refresh_failure_returns_none() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/auth/refresh")
            .with_status(401)
            .with_body(r#"{"message":"expired"}"#)
            .create_async()
            .await;

        let store = SessionTokenStore::new(&server.url(), Duration::from_secs(5), device()).unwrap();
        store.set_tokens(pair("a1", "r1")).await.unwrap();

        assert!(store.refresh_access_token().await.is_none());
        assert_eq!(store.access_token().await.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_refresh_honours_configured_timeout() {
        // Accepts connections and never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _silent = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let store = SessionTokenStore::new(
            &format!("http://{}", addr),
            Duration::from_millis(200),
            device(),
        )
        .unwrap();
        store.set_tokens(pair("a1", "r1")).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), store.refresh_access_token())
            .await
            .expect("refresh should give up after the client timeout");
        assert!(result.is_none());
        assert_eq!(store.access_token().await.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn test_no_refresh_token_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth/refresh")
            .expect(0)
            .create_async()
            .await;

        let store = SessionTokenStore::new(&server.url(), Duration::from_secs(5), device()).unwrap();
        assert!(store.refresh_access_token().await.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_session_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionTokenStore::open(&path, "http://localhost", Duration::from_secs(1), device())
            .await
            .unwrap();
        assert!(store.access_token().await.is_none());
        store.set_tokens(pair("a1", "r1")).await.unwrap();

        let reopened = SessionTokenStore::open(&path, "http://localhost", Duration::from_secs(1), device())
            .await
            .unwrap();
        assert_eq!(reopened.access_token().await.as_deref(), Some("a1"));

        reopened.clear().await.unwrap();
        assert!(!path.exists());
        assert!(reopened.refresh_token().await.is_none());
    }
}
