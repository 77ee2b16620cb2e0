use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use vidtube_types::api::{ContentRequest, PageQuery};
use vidtube_types::models::Comment;

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiQuery, ensure_owner, non_blank, parse_id};
use crate::middleware::CurrentUser;
use crate::response::{ApiResponse, empty};
use crate::state::{AppState, with_db};

async fn ensure_video_visible(state: &AppState, video_id: Uuid, viewer: Uuid) -> Result<(), ApiError> {
    with_db(state, move |db| db.get_video(video_id))
        .await?
        .filter(|v| v.is_published || v.owner.id == viewer)
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("Video not found"))
}

async fn load_comment(state: &AppState, raw_id: &str) -> Result<Comment, ApiError> {
    let id = parse_id(raw_id, "Invalid comment ID")?;
    with_db(state, move |db| db.get_comment(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))
}

/// GET /comments/{videoId}
pub async fn list_comments(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let video_id = parse_id(&raw_id, "Invalid video ID")?;
    ensure_video_visible(&state, video_id, caller.id()).await?;

    let (limit, offset) = page.window();
    let comments = with_db(&state, move |db| db.list_comments(video_id, limit, offset)).await?;
    Ok(ApiResponse::ok(comments, "Comments fetched successfully"))
}

/// POST /comments/{videoId}
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let video_id = parse_id(&raw_id, "Invalid video ID")?;
    let content = non_blank(req.content).ok_or_else(|| ApiError::bad_request("Comment text is required"))?;
    ensure_video_visible(&state, video_id, caller.id()).await?;

    let author = caller.id();
    let comment = with_db(&state, move |db| db.insert_comment(video_id, author, &content)).await?;

    info!("User {} commented on video {}", caller.0.username, video_id);
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

/// PATCH /comments/c/{commentId}
pub async fn update_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
    body: Result<ApiJson<ContentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = load_comment(&state, &raw_id).await?;
    ensure_owner(comment.owner.id, caller.id(), "Unauthorized to update this comment")?;

    let ApiJson(req) = body?;
    let content = non_blank(req.content).ok_or_else(|| ApiError::bad_request("Comment text is required"))?;

    let id = comment.id;
    let updated = with_db(&state, move |db| db.update_comment(id, &content))
        .await?
        .ok_or_else(|| ApiError::not_found("Comment not found"))?;

    Ok(ApiResponse::ok(updated, "Comment updated successfully"))
}

/// DELETE /comments/c/{commentId}
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = load_comment(&state, &raw_id).await?;
    ensure_owner(comment.owner.id, caller.id(), "Unauthorized to delete this comment")?;

    let id = comment.id;
    if !with_db(&state, move |db| db.delete_comment(id)).await? {
        return Err(ApiError::not_found("Comment not found"));
    }

    info!("Comment {} deleted", id);
    Ok(ApiResponse::ok(empty(), "Comment deleted successfully"))
}
