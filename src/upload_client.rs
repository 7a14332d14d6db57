use crate::errors::AppError;
use crate::models::UploadResponse;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const UPLOAD_SUCCESS_MESSAGE: &str =
    "File uploaded. Ingestion and matching will start shortly.";
pub const MISSING_FILE_MESSAGE: &str = "Select a CSV file first.";

const DEFAULT_FILE_NAME: &str = "upload.csv";

/// Pre-signed form-POST target issued by the ingestion service.
#[derive(Debug, Clone, Deserialize)]
pub struct PresignedUpload {
    pub url: String,
    /// Form fields that must precede the file part.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresignResponse {
    pub upload: PresignedUpload,
    #[serde(default)]
    pub key: Option<String>,
}

/// Hands CSV files to the ingestion pipeline through a pre-signed upload.
#[derive(Clone)]
pub struct UploadClient {
    client: reqwest::Client,
    base_url: String,
}

impl UploadClient {
    pub fn new(base_url: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create upload client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Asks the ingestion service for a fresh upload target.
    pub async fn request_upload_target(&self) -> Result<PresignResponse, AppError> {
        let url = format!("{}/upload-url", self.base_url);
        tracing::debug!("Requesting upload target: {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Upload URL request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Upload URL request failed ({})",
                response.status().as_u16()
            )));
        }

        response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse upload target: {}", e))
        })
    }

    /// Requests a target, then posts the issued fields plus the file to it.
    pub async fn upload_csv(
        &self,
        file_name: Option<&str>,
        contents: Vec<u8>,
    ) -> Result<UploadResponse, AppError> {
        if contents.is_empty() {
            return Err(AppError::BadRequest(MISSING_FILE_MESSAGE.to_string()));
        }

        let file_name = file_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();
        let size = contents.len();

        let target = self.request_upload_target().await?;

        let mut form = Form::new();
        for (name, value) in target.upload.fields {
            form = form.text(name, value);
        }
        let file = Part::bytes(contents)
            .file_name(file_name.clone())
            .mime_str("text/csv")
            .map_err(|e| AppError::InternalError(format!("Invalid upload mime type: {}", e)))?;
        form = form.part("file", file);

        let response = self
            .client
            .post(&target.upload.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Storage upload failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Storage upload failed ({})",
                response.status().as_u16()
            )));
        }

        tracing::info!(
            "Uploaded {} ({} bytes) as {}",
            file_name,
            size,
            target.key.as_deref().unwrap_or("<unknown key>")
        );

        Ok(UploadResponse {
            status: UPLOAD_SUCCESS_MESSAGE.to_string(),
            key: target.key,
        })
    }
}
