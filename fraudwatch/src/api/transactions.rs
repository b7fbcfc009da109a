use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{
    models::{ClearResponse, NotifyRequest, NotifyResponse, UploadResponse},
    ApiClient, ApiError,
};
use crate::domain::prelude::*;

impl ApiClient {
    /// GET /transactions
    pub async fn transactions(&self) -> Result<Vec<Transaction>, ApiError> {
        self.get_json("/transactions").await
    }

    /// POST /transactions/notify
    ///
    /// Asks the backend to e-mail an alert for one transaction. Without an
    /// explicit recipient the backend falls back to its admin address.
    ///
    pub async fn notify_transaction(
        &self,
        id: &str,
        email: Option<&str>,
    ) -> Result<NotifyResponse, ApiError> {
        let response: NotifyResponse = self
            .post_json("/transactions/notify", Some(&NotifyRequest { id, email }))
            .await?;
        info!(id, recipient = email.unwrap_or("default"), "fraud alert sent");
        Ok(response)
    }

    /// POST /transactions/clear
    pub async fn clear_transactions(&self) -> Result<ClearResponse, ApiError> {
        let response: ClearResponse = self
            .post_json::<(), _>("/transactions/clear", None)
            .await?;
        info!(deleted = response.deleted, "transactions cleared");
        Ok(response)
    }

    /// POST /upload
    ///
    /// Sends a CSV file as the multipart field `file`. Files whose name
    /// does not end in `.csv` are rejected without contacting the backend.
    ///
    pub async fn upload_csv(&self, path: &Path) -> Result<UploadResponse, ApiError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| n.ends_with(".csv"))
            .ok_or_else(|| {
                ApiError::InvalidFile("Invalid file format. Please upload a CSV.".to_string())
            })?
            .to_string();

        let contents = tokio::fs::read(path).await?;
        self.upload_csv_bytes(file_name, contents).await
    }

    /// Multipart upload of in-memory CSV contents under `file_name`.
    pub async fn upload_csv_bytes(
        &self,
        file_name: String,
        contents: Vec<u8>,
    ) -> Result<UploadResponse, ApiError> {
        if !file_name.ends_with(".csv") {
            return Err(ApiError::InvalidFile(
                "Invalid file format. Please upload a CSV.".to_string(),
            ));
        }
        let size = contents.len();
        let part = reqwest::multipart::Part::bytes(contents)
            .file_name(file_name.clone())
            .mime_str("text/csv")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let request = self.authorized(self.http().post(self.url("/upload")).multipart(form))?;
        let response: UploadResponse = Self::decode(self.send(request).await?).await?;
        info!(
            file = %file_name,
            bytes = size,
            rows = response.rows_processed,
            "csv uploaded"
        );
        Ok(response)
    }

    /// GET /reports/fraud.pdf
    pub async fn fraud_report(&self) -> Result<Vec<u8>, ApiError> {
        let request = self.authorized(self.http().get(self.url("/reports/fraud.pdf")))?;
        let response = self.send(request).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Downloads the fraud report into `dir`, returning the written path.
    pub async fn download_fraud_report(&self, dir: &Path) -> Result<PathBuf, ApiError> {
        let pdf = self.fraud_report().await?;
        let path = dir.join(report_file_name(Utc::now()));
        tokio::fs::write(&path, &pdf).await?;
        info!(path = %path.display(), bytes = pdf.len(), "fraud report saved");
        Ok(path)
    }
}

/// File name for a report downloaded at `at`, safe on every platform.
pub fn report_file_name(at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("anomalyse_fraud_report_{stamp}.pdf")
}
