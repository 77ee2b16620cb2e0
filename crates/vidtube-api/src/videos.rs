use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use vidtube_db::{NewVideo, VideoFilter, VideoSort};
use vidtube_types::api::{PageQuery, UpdateVideoRequest, VideoListQuery};
use vidtube_types::models::Video;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, ensure_owner, non_blank, parse_id};
use crate::media::{MediaAsset, upload_asset};
use crate::middleware::CurrentUser;
use crate::response::{ApiResponse, empty};
use crate::state::{AppState, with_db};
use crate::upload::SpooledForm;

const INVALID_ID: &str = "Invalid video ID";

async fn load_video(state: &AppState, id: Uuid) -> Result<Option<Video>, ApiError> {
    with_db(state, move |db| db.get_video(id)).await
}

/// Load a video or 404. Drafts are only visible to their owner.
async fn load_visible(state: &AppState, id: Uuid, viewer: Uuid) -> Result<Video, ApiError> {
    load_video(state, id)
        .await?
        .filter(|v| v.is_published || v.owner.id == viewer)
        .ok_or_else(|| ApiError::not_found("Video not found"))
}

/// 404 if absent, 403 unless `caller` owns it. Drafts are not hidden here.
async fn check_owner(state: &AppState, id: Uuid, caller: Uuid, denied: &str) -> Result<(), ApiError> {
    let video = load_video(state, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;
    ensure_owner(video.owner.id, caller, denied)
}

/// GET /videos
pub async fn list_videos(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiQuery(q): ApiQuery<VideoListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (limit, offset) = PageQuery { page: q.page, limit: q.limit }.window();
    let filter = VideoFilter {
        search: non_blank(q.query),
        // a malformed owner filter is ignored
        owner_id: q.user_id.and_then(|raw| raw.trim().parse().ok()),
        viewer_id: caller.id(),
        sort: q.sort_by.as_deref().and_then(VideoSort::from_param).unwrap_or_default(),
        descending: !q.sort_type.is_some_and(|t| t.eq_ignore_ascii_case("asc")),
        limit,
        offset,
    };

    let videos = with_db(&state, move |db| db.list_videos(&filter)).await?;
    Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}

/// POST /videos (multipart)
pub async fn publish_video(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    form: SpooledForm,
) -> Result<impl IntoResponse, ApiError> {
    let (Some(title), Some(description)) = (form.text("title"), form.text("description")) else {
        return Err(ApiError::bad_request("Title and description are required"));
    };
    let video_file = form.require_file(MediaAsset::VideoFile)?;
    let thumbnail_file = form.require_file(MediaAsset::Thumbnail)?;

    let video = upload_asset(state.media.as_ref(), MediaAsset::VideoFile, &video_file.path).await?;
    let thumbnail = upload_asset(state.media.as_ref(), MediaAsset::Thumbnail, &thumbnail_file.path).await?;

    let duration = form
        .text("duration")
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .or(video.duration)
        .unwrap_or(0.0);

    let owner_id = caller.id();
    let created = with_db(&state, move |db| {
        db.insert_video(&NewVideo {
            owner_id,
            video_file: &video.url,
            thumbnail: &thumbnail.url,
            title: &title,
            description: &description,
            duration,
        })
    })
    .await?;

    info!("User {} published video {}", caller.0.username, created.id);
    Ok(ApiResponse::created(created, "Video published successfully"))
}

/// GET /videos/{videoId}. Counts a view and records it in the caller's history.
pub async fn get_video(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id, INVALID_ID)?;
    let viewer = caller.id();
    load_visible(&state, id, viewer).await?;

    let video = with_db(&state, move |db| {
        db.increment_views(id)?;
        db.record_watch(viewer, id)?;
        db.get_video(id)
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

/// PATCH /videos/{videoId}. The body is read only after the ownership check.
pub async fn update_video(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
    body: Result<ApiJson<UpdateVideoRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id, INVALID_ID)?;
    check_owner(&state, id, caller.id(), "Unauthorized to update this video").await?;

    let ApiJson(req) = body?;
    let title = non_blank(req.title);
    let description = non_blank(req.description);
    if title.is_none() && description.is_none() {
        return Err(ApiError::bad_request("Title or description is required"));
    }

    let updated = with_db(&state, move |db| {
        db.update_video(id, title.as_deref(), description.as_deref())
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Video not found"))?;

    info!("Video {} updated", id);
    Ok(ApiResponse::ok(updated, "Video updated successfully"))
}

/// DELETE /videos/{videoId}
pub async fn delete_video(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id, INVALID_ID)?;
    check_owner(&state, id, caller.id(), "Unauthorized to delete this video").await?;

    if !with_db(&state, move |db| db.delete_video(id)).await? {
        return Err(ApiError::not_found("Video not found"));
    }

    info!("Video {} deleted", id);
    Ok(ApiResponse::ok(empty(), "Video deleted successfully"))
}

/// PATCH /videos/toggle/publish/{videoId}
pub async fn toggle_publish(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&raw_id, INVALID_ID)?;
    check_owner(&state, id, caller.id(), "Unauthorized to change publish status").await?;

    let toggled = with_db(&state, move |db| db.toggle_publish(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    info!("Video {} published={}", id, toggled.is_published);
    Ok(ApiResponse::ok(toggled, "Video publish status toggled"))
}
