//! Image upload proxy to Cloudinary.
//!
//! Admin uploads arrive as multipart bodies, are checked here, and are
//! forwarded to Cloudinary's signed upload API. Only the resulting URL and
//! public ID are stored locally.
//!
//! # API Reference
//!
//! - Upload: `POST https://api.cloudinary.com/v1_1/{cloud}/image/upload`
//! - Destroy: `POST https://api.cloudinary.com/v1_1/{cloud}/image/destroy`
//! - Signature: hex SHA-256 of the sorted `key=value&...` string followed
//!   by the API secret

use std::sync::Arc;

use axum::body::Bytes;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::instrument;

use crate::config::CloudinaryConfig;

const BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Folder uploaded product images are placed in.
pub const PRODUCT_FOLDER: &str = "cobbler/products";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("uploads are not configured")]
    NotConfigured,

    #[error("unsupported content type {0:?}, expected an image")]
    UnsupportedType(String),

    #[error("file is {size} bytes, the limit is {max}")]
    TooLarge { size: usize, max: usize },

    #[error("file is empty")]
    Empty,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("asset host error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// An image accepted for upload.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl ImageFile {
    /// Reject non-images and bodies over `max_bytes` before any network I/O.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::UnsupportedType`, `UploadError::Empty` or
    /// `UploadError::TooLarge`.
    pub fn validate(&self, max_bytes: usize) -> Result<(), UploadError> {
        let essence = self
            .content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if !essence.starts_with("image/") || essence.len() == "image/".len() {
            return Err(UploadError::UnsupportedType(self.content_type.clone()));
        }
        if self.data.is_empty() {
            return Err(UploadError::Empty);
        }
        if self.data.len() > max_bytes {
            return Err(UploadError::TooLarge {
                size: self.data.len(),
                max: max_bytes,
            });
        }
        Ok(())
    }
}

/// What the asset host reports for a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedAsset {
    pub public_id: String,
    pub secure_url: String,
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Signs and sends uploads to Cloudinary.
#[derive(Clone)]
pub struct AssetUploader {
    inner: Arc<AssetUploaderInner>,
}

struct AssetUploaderInner {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    max_bytes: usize,
}

impl AssetUploader {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig, max_bytes: usize) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()?;

        Ok(Self {
            inner: Arc::new(AssetUploaderInner {
                client,
                cloud_name: config.cloud_name.clone(),
                api_key: config.api_key.clone(),
                api_secret: config.api_secret.clone(),
                max_bytes,
            }),
        })
    }

    #[must_use]
    pub fn max_bytes(&self) -> usize {
        self.inner.max_bytes
    }

    /// Upload an image into `folder`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any request is made, or an HTTP,
    /// API or parse error from the asset host.
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.data.len()))]
    pub async fn upload(&self, file: ImageFile, folder: &str) -> Result<UploadedAsset, UploadError> {
        file.validate(self.inner.max_bytes)?;

        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("folder", folder), ("timestamp", &timestamp)],
            self.inner.api_secret.expose_secret(),
        );

        let part = Part::bytes(file.data.to_vec())
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .part("file", part)
            .text("folder", folder.to_owned())
            .text("timestamp", timestamp)
            .text("api_key", self.inner.api_key.clone())
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .inner
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;

        let asset: UploadedAsset = handle_response(response).await?;
        tracing::info!(public_id = %asset.public_id, "Image uploaded");
        Ok(asset)
    }

    /// Ask the asset host to delete an uploaded image.
    ///
    /// # Errors
    ///
    /// Returns an HTTP, API or parse error from the asset host.
    #[instrument(skip(self))]
    pub async fn destroy(&self, public_id: &str) -> Result<(), UploadError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            self.inner.api_secret.expose_secret(),
        );

        let params = [
            ("public_id", public_id),
            ("timestamp", timestamp.as_str()),
            ("api_key", self.inner.api_key.as_str()),
            ("signature_algorithm", "sha256"),
            ("signature", signature.as_str()),
        ];
        let response = self
            .inner
            .client
            .post(self.endpoint("destroy"))
            .form(&params)
            .send()
            .await?;

        let body: DestroyResponse = handle_response(response).await?;
        if body.result != "ok" && body.result != "not found" {
            return Err(UploadError::Api {
                status: 200,
                message: body.result,
            });
        }
        Ok(())
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{BASE_URL}/{}/image/{action}", self.inner.cloud_name)
    }
}

impl std::fmt::Debug for AssetUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetUploader")
            .field("cloud_name", &self.inner.cloud_name)
            .field("max_bytes", &self.inner.max_bytes)
            .finish_non_exhaustive()
    }
}

/// Cloudinary request signature over `params`.
///
/// Parameters are sorted by name, joined as `k=v&k=v`, and hashed together
/// with the API secret. `file`, `api_key` and the signature fields
/// themselves are never signed.
#[must_use]
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

async fn handle_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, UploadError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| UploadError::Parse(format!("failed to parse response: {e}")));
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error.message)
        .unwrap_or(text);
    Err(UploadError::Api {
        status: status.as_u16(),
        message,
    })
}
