use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read media file: {0}")]
    Io(#[from] std::io::Error),
    #[error("media host request failed: {0}")]
    Transport(String),
    #[error("media host rejected upload: {0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
pub struct UploadedMedia {
    pub url: String,
}

/// Capability interface for the hosted media service: takes a staged
/// local file and returns its hosted URL.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, UploadError>;
}

pub struct HostedMediaUploader {
    http: reqwest::Client,
    upload_url: String,
    upload_preset: String,
}

impl HostedMediaUploader {
    pub fn new(upload_url: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            upload_url: upload_url.into(),
            upload_preset: upload_preset.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

#[async_trait]
impl MediaUploader for HostedMediaUploader {
    async fn upload(&self, path: &Path) -> Result<UploadedMedia, UploadError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .part("file", part);

        let res = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| UploadError::Transport(err.to_string()))?;

        if !res.status().is_success() {
            return Err(UploadError::Rejected(format!(
                "upload returned status {}",
                res.status()
            )));
        }

        let body: UploadResponse = res
            .json()
            .await
            .map_err(|err| UploadError::Rejected(err.to_string()))?;

        tracing::debug!("media uploaded to {}", body.secure_url);
        Ok(UploadedMedia {
            url: body.secure_url,
        })
    }
}
