use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use vidtube_types::api::PageQuery;

use crate::error::ApiError;
use crate::extract::{ApiQuery, parse_id};
use crate::middleware::CurrentUser;
use crate::response::ApiResponse;
use crate::state::{AppState, with_db};

async fn channel_id(state: &AppState, raw_id: &str) -> Result<Uuid, ApiError> {
    let id = parse_id(raw_id, "Invalid channel ID")?;
    with_db(state, move |db| db.get_user(id))
        .await?
        .map(|user| user.id)
        .ok_or_else(|| ApiError::not_found("Channel not found"))
}

/// GET /dashboard/stats/{channelId}
pub async fn channel_stats(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = channel_id(&state, &raw_id).await?;
    let stats = with_db(&state, move |db| db.channel_stats(id)).await?;
    Ok(ApiResponse::ok(stats, "Channel stats fetched successfully"))
}

/// GET /dashboard/videos/{channelId}. Drafts are included for the channel itself.
pub async fn channel_videos(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let id = channel_id(&state, &raw_id).await?;
    let include_unpublished = id == caller.id();
    let (limit, offset) = page.window();

    let videos = with_db(&state, move |db| db.channel_videos(id, include_unpublished, limit, offset)).await?;
    Ok(ApiResponse::ok(videos, "Channel videos fetched successfully"))
}
