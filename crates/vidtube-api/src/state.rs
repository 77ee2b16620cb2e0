use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use vidtube_db::Database;

use crate::error::ApiError;
use crate::media::MediaUploader;
use crate::tokens::TokenService;

pub type AppState = Arc<AppStateInner>;

/// Shared by every handler. Built once at startup.
pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenService,
    pub media: Arc<dyn MediaUploader>,
    /// Where incoming multipart files are spooled before upload.
    pub upload_dir: PathBuf,
}

/// Run a blocking store call on the blocking pool.
pub async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal("Something went wrong")
        })?
        .map_err(ApiError::from)
}
