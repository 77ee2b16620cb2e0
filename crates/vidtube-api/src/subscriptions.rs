use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::parse_id;
use crate::middleware::CurrentUser;
use crate::response::{ApiResponse, empty};
use crate::state::{AppState, with_db};

async fn ensure_channel(state: &AppState, channel_id: Uuid) -> Result<(), ApiError> {
    with_db(state, move |db| db.get_user(channel_id))
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::not_found("Channel not found"))
}

/// POST /subscriptions/c/{channelId}
pub async fn toggle_subscription(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<Response, ApiError> {
    let channel_id = parse_id(&raw_id, "Invalid channel ID")?;
    let subscriber_id = caller.id();
    if channel_id == subscriber_id {
        return Err(ApiError::bad_request("You cannot subscribe to your own channel"));
    }
    ensure_channel(&state, channel_id).await?;

    let created = with_db(&state, move |db| db.toggle_subscription(subscriber_id, channel_id)).await?;
    Ok(match created {
        Some(subscription) => {
            info!("User {} subscribed to {}", caller.0.username, channel_id);
            ApiResponse::created(subscription, "Subscribed successfully").into_response()
        }
        None => {
            info!("User {} unsubscribed from {}", caller.0.username, channel_id);
            ApiResponse::ok(empty(), "Subscription removed successfully").into_response()
        }
    })
}

/// GET /subscriptions/c/{channelId}
pub async fn channel_subscribers(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let channel_id = parse_id(&raw_id, "Invalid channel ID")?;
    ensure_channel(&state, channel_id).await?;

    let subscribers = with_db(&state, move |db| db.list_subscribers(channel_id)).await?;
    Ok(ApiResponse::ok(subscribers, "Channel subscribers fetched successfully"))
}

/// GET /subscriptions/subscribed
pub async fn subscribed_channels(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let id = caller.id();
    let channels = with_db(&state, move |db| db.list_subscribed_channels(id)).await?;
    Ok(ApiResponse::ok(channels, "Subscribed channels fetched successfully"))
}
