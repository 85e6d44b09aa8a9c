//! Image-hosting collaborator.
//!
//! The hosting service itself is external: it takes a local file and returns
//! a durable URL, and supports delete-by-id. This module is only the seam the
//! catalog and blog handlers talk through.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::error::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct HostedImage {
    pub url: String,
    pub public_id: String,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Hospedagem de imagens não configurada.")]
    Unconfigured,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Resposta inesperada do serviço de imagens")]
    BadResponse,
}

impl From<MediaError> for AppError {
    fn from(e: MediaError) -> Self {
        Self::Internal(e.to_string())
    }
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<HostedImage, MediaError>;
    async fn delete(&self, public_id: &str) -> Result<(), MediaError>;
}

pub struct HttpImageHost {
    http: reqwest::Client,
    upload_url: Option<String>,
    preset: Option<String>,
}

impl HttpImageHost {
    pub fn new(upload_url: Option<String>, preset: Option<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { http, upload_url, preset }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: String,
}

#[async_trait]
impl ImageHost for HttpImageHost {
    async fn upload(&self, filename: &str, bytes: Vec<u8>) -> Result<HostedImage, MediaError> {
        let upload_url = self.upload_url.as_deref().ok_or(MediaError::Unconfigured)?;

        let mut form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string()),
        );
        if let Some(preset) = &self.preset {
            form = form.text("upload_preset", preset.clone());
        }

        let body = self
            .http
            .post(upload_url)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json::<UploadResponse>()
            .await?;

        let url = body.secure_url.or(body.url).ok_or(MediaError::BadResponse)?;
        Ok(HostedImage { url, public_id: body.public_id })
    }

    async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        let upload_url = self.upload_url.as_deref().ok_or(MediaError::Unconfigured)?;
        self.http
            .delete(format!("{}/{}", upload_url.trim_end_matches('/'), public_id))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
