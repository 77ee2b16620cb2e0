use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use futures_util::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;

/// Where an uploaded asset ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedMedia {
    pub url: String,
    /// Reported by the host for audio/video, seconds.
    pub duration: Option<f64>,
}

/// Pushes a local file to durable media hosting.
///
/// Returns `None` on any failure; the caller decides the error message.
pub trait MediaUploader: Send + Sync {
    fn upload<'a>(&'a self, local_path: &'a Path) -> BoxFuture<'a, Option<UploadedMedia>>;
}

/// Multipart file fields the API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAsset {
    Avatar,
    CoverImage,
    VideoFile,
    Thumbnail,
}

impl MediaAsset {
    pub fn field(self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::CoverImage => "coverImage",
            Self::VideoFile => "videoFile",
            Self::Thumbnail => "thumbnail",
        }
    }

    pub fn missing_message(self) -> &'static str {
        match self {
            Self::Avatar => "Avatar file is required",
            Self::CoverImage => "Cover image file is required",
            Self::VideoFile => "Video file is required",
            Self::Thumbnail => "Thumbnail is required",
        }
    }

    pub fn failed_message(self) -> &'static str {
        match self {
            Self::Avatar => "Error uploading avatar",
            Self::CoverImage => "Error uploading cover image",
            Self::VideoFile => "Error uploading video file",
            Self::Thumbnail => "Error uploading thumbnail",
        }
    }
}

/// Upload `local_path` as `asset`, mapping failure to a 500 naming the asset.
pub async fn upload_asset(
    media: &dyn MediaUploader,
    asset: MediaAsset,
    local_path: &Path,
) -> Result<UploadedMedia, ApiError> {
    match media.upload(local_path).await {
        Some(uploaded) => Ok(uploaded),
        None => {
            warn!("Upload of {} from {} failed", asset.field(), local_path.display());
            Err(ApiError::internal(asset.failed_message()))
        }
    }
}

// -- Cloudinary --

#[derive(Deserialize)]
struct CloudinaryResponse {
    secure_url: String,
    duration: Option<f64>,
}

pub struct CloudinaryUploader {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryUploader {
    pub fn new(cloud_name: String, api_key: String, api_secret: String) -> Self {
        Self {
            client: Client::new(),
            cloud_name,
            api_key,
            api_secret,
        }
    }

    async fn try_upload(&self, local_path: &Path) -> Result<UploadedMedia> {
        let bytes = fs::read(local_path)
            .await
            .with_context(|| format!("reading {}", local_path.display()))?;
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(&[("timestamp", timestamp.as_str())], &self.api_secret);

        let form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(bytes).file_name(file_name))
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature);

        // resource_type "auto" lets the host detect image vs video
        let url = format!("https://api.cloudinary.com/v1_1/{}/auto/upload", self.cloud_name);
        let response = self.client.post(&url).multipart(form).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("cloudinary returned {}: {}", status, body);
        }

        let body: CloudinaryResponse = response.json().await?;
        Ok(UploadedMedia {
            url: body.secure_url,
            duration: body.duration,
        })
    }
}

impl MediaUploader for CloudinaryUploader {
    fn upload<'a>(&'a self, local_path: &'a Path) -> BoxFuture<'a, Option<UploadedMedia>> {
        Box::pin(async move {
            match self.try_upload(local_path).await {
                Ok(uploaded) => {
                    info!("Uploaded {} to {}", local_path.display(), uploaded.url);
                    Some(uploaded)
                }
                Err(e) => {
                    warn!("Cloudinary upload failed: {:#}", e);
                    None
                }
            }
        })
    }
}

/// Signature over sorted `key=value` pairs joined by `&`, followed by the secret.
fn sign_params(params: &[(&str, &str)], secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by_key(|(key, _)| *key);
    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

// -- Local disk --

/// Copies uploads into `media_dir`, served under `{public_url}/media/`.
pub struct LocalUploader {
    media_dir: PathBuf,
    public_url: String,
}

impl LocalUploader {
    pub async fn new(media_dir: PathBuf, public_url: &str) -> Result<Self> {
        fs::create_dir_all(&media_dir).await?;
        info!("Local media directory: {}", media_dir.display());
        Ok(Self {
            media_dir,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    async fn try_upload(&self, local_path: &Path) -> Result<UploadedMedia> {
        let name = match local_path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        fs::copy(local_path, self.media_dir.join(&name))
            .await
            .with_context(|| format!("copying {}", local_path.display()))?;

        Ok(UploadedMedia {
            url: format!("{}/media/{}", self.public_url, name),
            duration: None,
        })
    }
}

impl MediaUploader for LocalUploader {
    fn upload<'a>(&'a self, local_path: &'a Path) -> BoxFuture<'a, Option<UploadedMedia>> {
        Box::pin(async move {
            self.try_upload(local_path)
                .await
                .map_err(|e| warn!("Local media copy failed: {:#}", e))
                .ok()
        })
    }
}
