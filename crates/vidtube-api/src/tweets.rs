use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use tracing::info;

use vidtube_types::api::ContentRequest;
use vidtube_types::models::Tweet;

use crate::error::ApiError;
use crate::extract::{ApiJson, ensure_owner, non_blank, parse_id};
use crate::middleware::CurrentUser;
use crate::response::{ApiResponse, empty};
use crate::state::{AppState, with_db};

const EMPTY_CONTENT: &str = "Tweet content cannot be empty";

async fn load_tweet(state: &AppState, raw_id: &str) -> Result<Tweet, ApiError> {
    let id = parse_id(raw_id, "Invalid tweet ID")?;
    with_db(state, move |db| db.get_tweet(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Tweet not found"))
}

/// POST /tweets
pub async fn create_tweet(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = non_blank(req.content).ok_or_else(|| ApiError::bad_request(EMPTY_CONTENT))?;

    let author = caller.id();
    let tweet = with_db(&state, move |db| db.insert_tweet(author, &content)).await?;

    info!("User {} tweeted {}", caller.0.username, tweet.id);
    Ok(ApiResponse::created(tweet, "Tweet created successfully"))
}

/// GET /tweets/user/{userId}
pub async fn user_tweets(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let author = parse_id(&raw_id, "Invalid user ID")?;
    with_db(&state, move |db| db.get_user(author))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let tweets = with_db(&state, move |db| db.list_user_tweets(author)).await?;
    Ok(ApiResponse::ok(tweets, "Tweets fetched successfully"))
}

/// PATCH /tweets/{tweetId}
pub async fn update_tweet(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
    body: Result<ApiJson<ContentRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let tweet = load_tweet(&state, &raw_id).await?;
    ensure_owner(tweet.owner.id, caller.id(), "Unauthorized to update this tweet")?;

    let ApiJson(req) = body?;
    let content = non_blank(req.content).ok_or_else(|| ApiError::bad_request(EMPTY_CONTENT))?;

    let id = tweet.id;
    let updated = with_db(&state, move |db| db.update_tweet(id, &content))
        .await?
        .ok_or_else(|| ApiError::not_found("Tweet not found"))?;

    Ok(ApiResponse::ok(updated, "Tweet updated successfully"))
}

/// DELETE /tweets/{tweetId}
pub async fn delete_tweet(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    Path(raw_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tweet = load_tweet(&state, &raw_id).await?;
    ensure_owner(tweet.owner.id, caller.id(), "Unauthorized to delete this tweet")?;

    let id = tweet.id;
    if !with_db(&state, move |db| db.delete_tweet(id)).await? {
        return Err(ApiError::not_found("Tweet not found"));
    }

    info!("Tweet {} deleted", id);
    Ok(ApiResponse::ok(empty(), "Tweet deleted successfully"))
}
