//! # wallet-slot-client
//!
//! Async client core for the Wallet Slot budgeting backend. Every call goes
//! through one pipeline that attaches device and trace headers, refreshes an
//! expired access token exactly once no matter how many requests hit 401 at the
//! same time, retries transient failures with jittered backoff and resolves the
//! many body shapes the backend produces into one [`Envelope`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use wallet_slot_client::{ApiClient, Config};
//! use wallet_slot_client::dto::ListParams;
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Load configuration from config.toml
//! let config = Config::new()?;
//!
//! // Session tokens and the device id persist under storage.data_dir
//! let client = ApiClient::open(config).await?;
//! client.auth().login("01012345678", "123456").await?;
//!
//! let accounts = client.accounts().list().await?;
//! for account in &accounts.data.accounts {
//!     let slots = client.slots().list(&account.account_id).await?;
//!     println!("{}: {} slots", account.bank_name, slots.data.len());
//! }
//!
//! // Failures here come back as success: false with an empty list
//! let inbox = client.notifications().list(ListParams::default()).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! ```toml
//! [api]
//! base_url = "https://api.example.com/v1"
//! timeout_secs = 10
//! transport = "client"   # or "fetch"
//! debug = false
//!
//! [retry]
//! max_retries = 2
//! base_delay_ms = 300
//!
//! [storage]
//! data_dir = ".wallet-slot"
//! ```
//!
//! `WALLET_SLOT_BASE_URL`, `WALLET_SLOT_DEBUG` and `WALLET_SLOT_TRANSPORT`
//! override the file.

pub mod api;
pub mod api_client;
pub mod config;
pub mod device;
pub mod dto;
pub mod error;
pub mod normalizer;
pub mod refresh;
pub mod request;
pub mod retry;
pub mod sanitizer;
pub mod token_store;
pub mod transport;

// Re-export commonly used types at the crate root
pub use api_client::{ApiClient, ApiClientBuilder, AuthFailureHook};
pub use config::Config;
pub use dto::{Envelope, ListParams, Meta};
pub use error::{ApiError, ErrorCode};
pub use request::{RequestConfig, UploadForm};
pub use token_store::TokenStore;
pub use transport::{Transport, TransportMode};
