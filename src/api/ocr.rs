use crate::api_client::ApiClient;
use crate::dto::{Envelope, ReceiptClassification};
use crate::error::ApiError;
use crate::normalizer::normalize_detail;
use crate::request::{RequestBody, RequestConfig, UploadForm};
use reqwest::Method;

/// Receipt OCR; the recognition service itself is opaque
pub struct OcrApi<'a> {
    client: &'a ApiClient,
}

impl<'a> OcrApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn classify_receipt(
        &self,
        file_name: &str,
        mime_type: &str,
        image: Vec<u8>,
        account_id: Option<&str>,
    ) -> Result<Envelope<ReceiptClassification>, ApiError> {
        let mut form = UploadForm::new().file("image", file_name, mime_type, image);
        if let Some(account_id) = account_id {
            form = form.text("accountId", account_id);
        }

        let raw = self
            .client
            .request_raw(
                Method::POST,
                "/ocr/receipt",
                RequestBody::Multipart(form),
                RequestConfig::default(),
            )
            .await?;
        Ok(normalize_detail(&raw).decode())
    }
}
