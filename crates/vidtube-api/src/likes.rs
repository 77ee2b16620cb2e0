use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::info;

use vidtube_db::LikeTarget;

use crate::error::ApiError;
use crate::extract::parse_id;
use crate::middleware::CurrentUser;
use crate::response::ApiResponse;
use crate::state::{AppState, with_db};

/// Checks the target exists, then flips the caller's like on it.
async fn toggle(state: &AppState, caller: &CurrentUser, target: LikeTarget) -> Result<Response, ApiError> {
    let viewer = caller.id();
    let exists = with_db(state, move |db| {
        Ok(match target {
            LikeTarget::Video(id) => db
                .get_video(id)?
                .is_some_and(|v| v.is_published || v.owner.id == viewer),
            LikeTarget::Comment(id) => db.get_comment(id)?.is_some(),
            LikeTarget::Tweet(id) => db.get_tweet(id)?.is_some(),
        })
    })
    .await?;

    let noun = match target {
        LikeTarget::Video(_) => "Video",
        LikeTarget::Comment(_) => "Comment",
        LikeTarget::Tweet(_) => "Tweet",
    };
    if !exists {
        return Err(ApiError::not_found(format!("{noun} not found")));
    }

    let liked = with_db(state, move |db| db.toggle_like(viewer, target)).await?;
    info!("User {} {} {:?}", caller.0.username, if liked { "liked" } else { "unliked" }, target);

    let data = json!({ "isLiked": liked });
    Ok(if liked {
        ApiResponse::created(data, format!("{noun} liked")).into_response()
    } else {
        ApiResponse::ok(data, format!("{noun} like removed")).into_response()
    })
}

/// POST /likes/toggle/v/{videoId}
pub async fn toggle_video_like(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&raw_id, "Invalid video ID")?;
    toggle(&state, &caller, LikeTarget::Video(id)).await
}

/// POST /likes/toggle/c/{commentId}
pub async fn toggle_comment_like(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&raw_id, "Invalid comment ID")?;
    toggle(&state, &caller, LikeTarget::Comment(id)).await
}

/// POST /likes/toggle/t/{tweetId}
pub async fn toggle_tweet_like(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&raw_id, "Invalid tweet ID")?;
    toggle(&state, &caller, LikeTarget::Tweet(id)).await
}

/// GET /likes/videos
pub async fn liked_videos(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let id = caller.id();
    let videos = with_db(&state, move |db| db.liked_videos(id)).await?;
    Ok(ApiResponse::ok(videos, "Liked videos fetched successfully"))
}
