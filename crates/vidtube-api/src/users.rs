use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use vidtube_db::is_constraint_violation;
use vidtube_types::api::UpdateAccountRequest;

use crate::error::ApiError;
use crate::extract::{ApiJson, non_blank};
use crate::media::{MediaAsset, upload_asset};
use crate::middleware::CurrentUser;
use crate::response::ApiResponse;
use crate::state::{AppState, with_db};
use crate::upload::SpooledForm;

/// GET /users/current-user
pub async fn current_user(Extension(caller): Extension<CurrentUser>) -> impl IntoResponse {
    ApiResponse::ok(caller.0, "Current user fetched successfully")
}

/// PATCH /users/update-account
pub async fn update_account(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiJson(req): ApiJson<UpdateAccountRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let full_name = non_blank(req.full_name);
    let email = non_blank(req.email).map(|e| e.to_lowercase());
    if full_name.is_none() && email.is_none() {
        return Err(ApiError::bad_request("Full name or email is required"));
    }

    let id = caller.id();
    if let Some(email) = email.clone() {
        if with_db(&state, move |db| db.email_taken_by_other(id, &email)).await? {
            return Err(ApiError::conflict("Email is already in use"));
        }
    }

    let updated = with_db(&state, move |db| {
        db.update_account(id, full_name.as_deref(), email.as_deref())
    })
    .await;
    let user = match updated {
        Err(ApiError::Other(e)) if is_constraint_violation(&e) => {
            return Err(ApiError::conflict("Email is already in use"));
        }
        other => other?.ok_or_else(|| ApiError::not_found("User not found"))?,
    };

    info!("User {} updated account details", user.username);
    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

/// PATCH /users/avatar (multipart `avatar`)
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    form: SpooledForm,
) -> Result<impl IntoResponse, ApiError> {
    let file = form.require_file(MediaAsset::Avatar)?;
    let uploaded = upload_asset(state.media.as_ref(), MediaAsset::Avatar, &file.path).await?;

    let id = caller.id();
    let user = with_db(&state, move |db| db.set_avatar(id, &uploaded.url))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!("User {} replaced avatar", user.username);
    Ok(ApiResponse::ok(user, "Avatar updated successfully"))
}

/// PATCH /users/cover-image (multipart `coverImage`)
pub async fn update_cover_image(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    form: SpooledForm,
) -> Result<impl IntoResponse, ApiError> {
    let file = form.require_file(MediaAsset::CoverImage)?;
    let uploaded = upload_asset(state.media.as_ref(), MediaAsset::CoverImage, &file.path).await?;

    let id = caller.id();
    let user = with_db(&state, move |db| db.set_cover_image(id, &uploaded.url))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    info!("User {} replaced cover image", user.username);
    Ok(ApiResponse::ok(user, "Cover image updated successfully"))
}

/// GET /users/c/{username}
pub async fn channel_profile(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let username = username.trim().to_lowercase();
    if username.is_empty() {
        return Err(ApiError::bad_request("Username is missing"));
    }

    let viewer = caller.id();
    let profile = with_db(&state, move |db| db.channel_profile(&username, viewer))
        .await?
        .ok_or_else(|| ApiError::not_found("Channel does not exist"))?;

    Ok(ApiResponse::ok(profile, "User channel fetched successfully"))
}

/// GET /users/history
pub async fn watch_history(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let id = caller.id();
    let videos = with_db(&state, move |db| db.watch_history(id)).await?;
    Ok(ApiResponse::ok(videos, "Watch history fetched successfully"))
}
