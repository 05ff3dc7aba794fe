use crate::retry::RetryConfig;
use crate::transport::TransportMode;
use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub transport: TransportMode,
    /// Log every request and response (sanitized)
    #[serde(default)]
    pub debug: bool,
    /// Re-read ambiguous list bodies once through the fetch transport
    #[serde(default = "default_true")]
    pub fallback_fetch: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".wallet-slot")
}

impl Config {
    /// Load `config.toml` from the working directory and apply environment overrides
    pub fn new() -> Result<Self> {
        Self::from_path("config.toml")
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&config_str)?;
        config.apply_env()?;
        info!("Config: {:?}", config);
        Ok(config)
    }

    /// Config for a base URL with every other setting at its default
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                base_url: base_url.into(),
                timeout_secs: default_timeout_secs(),
                transport: TransportMode::default(),
                debug: false,
                fallback_fetch: true,
            },
            retry: RetryConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// `WALLET_SLOT_BASE_URL`, `WALLET_SLOT_DEBUG` and `WALLET_SLOT_TRANSPORT` win over the file
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("WALLET_SLOT_BASE_URL") {
            self.api.base_url = url;
        }
        if let Ok(debug) = std::env::var("WALLET_SLOT_DEBUG") {
            self.api.debug = matches!(debug.trim(), "1" | "true" | "yes");
        }
        if let Ok(mode) = std::env::var("WALLET_SLOT_TRANSPORT") {
            self.api.transport = mode.parse()?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn device_id_path(&self) -> PathBuf {
        self.storage.data_dir.join("device_id")
    }

    pub fn session_path(&self) -> PathBuf {
        self.storage.data_dir.join("session.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::with_base_url("http://from-file");

        std::env::set_var("WALLET_SLOT_BASE_URL", "http://from-env");
        std::env::set_var("WALLET_SLOT_DEBUG", "true");
        std::env::set_var("WALLET_SLOT_TRANSPORT", "fetch");
        let result = config.apply_env();
        std::env::remove_var("WALLET_SLOT_BASE_URL");
        std::env::remove_var("WALLET_SLOT_DEBUG");
        std::env::remove_var("WALLET_SLOT_TRANSPORT");

        assert!(result.is_ok());
        assert_eq!(config.api.base_url, "http://from-env");
        assert!(config.api.debug);
        assert_eq!(config.api.transport, TransportMode::Fetch);
    }

    #[test]
    fn test_timeout_and_storage_paths() {
        let mut config = Config::with_base_url("http://localhost");
        config.storage.data_dir = PathBuf::from("/tmp/ws");
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.device_id_path(), PathBuf::from("/tmp/ws/device_id"));
    }
}
