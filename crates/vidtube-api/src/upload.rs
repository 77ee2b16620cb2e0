use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use axum::extract::{FromRequest, Multipart, Request};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::media::MediaAsset;
use crate::state::AppState;

/// A multipart file written to the spool directory. Removed on drop.
#[derive(Debug)]
pub struct SpooledFile {
    pub path: PathBuf,
    pub size: u64,
}

impl Drop for SpooledFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed spooled upload {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove spooled upload {}: {}", self.path.display(), e),
        }
    }
}

/// A multipart body with text fields in memory and files spooled to disk.
#[derive(Debug, Default)]
pub struct SpooledForm {
    fields: HashMap<String, String>,
    files: HashMap<String, SpooledFile>,
}

impl SpooledForm {
    pub async fn read(multipart: &mut Multipart, spool_dir: &Path) -> Result<Self, ApiError> {
        tokio::fs::create_dir_all(spool_dir)
            .await
            .with_context(|| format!("creating spool dir {}", spool_dir.display()))?;

        let mut form = Self::default();
        while let Some(mut field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            let file_name = field.file_name().map(str::to_owned);
            let Some(file_name) = file_name else {
                let text = field.text().await?;
                form.fields.insert(name, text);
                continue;
            };
            // browsers send an empty filename for an unselected file input
            if file_name.is_empty() {
                continue;
            }

            let path = match Path::new(&file_name).extension().and_then(|e| e.to_str()) {
                Some(ext) => spool_dir.join(format!("{}.{}", Uuid::new_v4(), ext)),
                None => spool_dir.join(Uuid::new_v4().to_string()),
            };
            let mut spooled = SpooledFile { path, size: 0 };

            let mut out = tokio::fs::File::create(&spooled.path)
                .await
                .with_context(|| format!("creating {}", spooled.path.display()))?;
            while let Some(chunk) = field.chunk().await? {
                out.write_all(&chunk).await.context("writing spooled upload")?;
                spooled.size += chunk.len() as u64;
            }
            out.flush().await.context("flushing spooled upload")?;

            debug!("Spooled {} ({} bytes) to {}", name, spooled.size, spooled.path.display());
            form.files.insert(name, spooled);
        }

        Ok(form)
    }

    /// Trimmed text field, `None` when absent or blank.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    pub fn file(&self, asset: MediaAsset) -> Option<&SpooledFile> {
        self.files.get(asset.field())
    }

    /// The file for `asset`, or 400 with the asset's "required" message.
    pub fn require_file(&self, asset: MediaAsset) -> Result<&SpooledFile, ApiError> {
        self.file(asset)
            .ok_or_else(|| ApiError::bad_request(asset.missing_message()))
    }
}

impl FromRequest<AppState> for SpooledForm {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state).await?;
        Self::read(&mut multipart, &state.upload_dir).await
    }
}
