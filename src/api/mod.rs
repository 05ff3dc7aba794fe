//! Thin typed façades over [`ApiClient`], one per backend resource family.
//!
//! ```no_run
//! use wallet_slot_client::{ApiClient, Config};
//! use wallet_slot_client::dto::ListParams;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = ApiClient::new(Config::new()?)?;
//! let accounts = client.accounts().list().await?;
//! let inbox = client.notifications().list(ListParams::new(1, 20)).await;
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod auth;
pub mod mydata;
pub mod notification;
pub mod ocr;
pub mod profile;
pub mod report;
pub mod slot;
pub mod transaction;

pub use account::AccountApi;
pub use auth::AuthApi;
pub use mydata::MydataApi;
pub use notification::NotificationApi;
pub use ocr::OcrApi;
pub use profile::ProfileApi;
pub use report::ReportApi;
pub use slot::SlotApi;
pub use transaction::TransactionApi;

use crate::api_client::ApiClient;

impl ApiClient {
    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn accounts(&self) -> AccountApi<'_> {
        AccountApi::new(self)
    }

    pub fn slots(&self) -> SlotApi<'_> {
        SlotApi::new(self)
    }

    pub fn transactions(&self) -> TransactionApi<'_> {
        TransactionApi::new(self)
    }

    pub fn notifications(&self) -> NotificationApi<'_> {
        NotificationApi::new(self)
    }

    pub fn mydata(&self) -> MydataApi<'_> {
        MydataApi::new(self)
    }

    pub fn ocr(&self) -> OcrApi<'_> {
        OcrApi::new(self)
    }

    pub fn profile(&self) -> ProfileApi<'_> {
        ProfileApi::new(self)
    }

    pub fn reports(&self) -> ReportApi<'_> {
        ReportApi::new(self)
    }
}
