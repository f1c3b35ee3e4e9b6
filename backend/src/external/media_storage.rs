//! Media storage client
//!
//! Uploads quality test photos to the object storage gateway and returns the
//! URL stored alongside the measurement.

use chrono::Utc;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use shared::MediaReference;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};

/// Client for the storage gateway
#[derive(Clone)]
pub struct MediaStorageClient {
    upload_endpoint: String,
    public_base_url: String,
    api_key: String,
    http_client: Client,
}

/// Response from the storage gateway
#[derive(Debug, Deserialize)]
struct UploadResponse {
    key: Option<String>,
    url: Option<String>,
}

/// An image ready to be stored
#[derive(Debug)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub original_filename: Option<String>,
}

impl MediaStorageClient {
    pub fn new(config: &StorageConfig) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            upload_endpoint: config.upload_endpoint.clone(),
            public_base_url: config.public_base_url.clone(),
            api_key: config.api_key.clone(),
            http_client,
        })
    }

    /// Store an image under `quality-tests/` and return where it can be read
    pub async fn upload_quality_image(&self, image: ImageUpload) -> AppResult<MediaReference> {
        let key = format!(
            "quality-tests/{}.{}",
            Uuid::new_v4(),
            extension_for(&image.content_type)
        );
        let size_bytes = image.bytes.len() as u64;

        let part = Part::bytes(image.bytes)
            .file_name(key.clone())
            .mime_str(&image.content_type)
            .map_err(|e| AppError::StorageError(format!("Invalid content type: {}", e)))?;
        let form = Form::new().text("key", key.clone()).part("file", part);

        let response = self
            .http_client
            .post(&self.upload_endpoint)
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::StorageError(format!("Upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::StorageError(format!(
                "Storage returned {}: {}",
                status, body
            )));
        }

        let result: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to parse response: {}", e)))?;

        let url = result
            .url
            .unwrap_or_else(|| public_url(&self.public_base_url, result.key.as_deref().unwrap_or(&key)));

        tracing::info!(size_bytes, "Quality test image stored at {}", url);

        Ok(MediaReference {
            url,
            content_type: image.content_type,
            size_bytes,
            original_filename: image.original_filename,
            uploaded_at: Utc::now(),
        })
    }
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key.trim_start_matches('/'))
}
