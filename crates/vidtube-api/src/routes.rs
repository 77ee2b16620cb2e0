use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, comments, dashboard, health, likes, subscriptions, tweets, users, videos};

/// Every `/api/v1` route. Only registration, login, token refresh and the
/// health check are reachable without an access token.
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    let public_routes = Router::new()
        .route("/users/register", post(auth::register))
        .route("/users/login", post(auth::login))
        .route("/users/refresh-token", post(auth::refresh_token))
        .route("/healthcheck", get(health::healthcheck));

    let protected_routes = Router::new()
        // users
        .route("/users/logout", post(auth::logout))
        .route("/users/change-password", post(auth::change_password))
        .route("/users/current-user", get(users::current_user))
        .route("/users/update-account", patch(users::update_account))
        .route("/users/avatar", patch(users::update_avatar))
        .route("/users/cover-image", patch(users::update_cover_image))
        .route("/users/c/{username}", get(users::channel_profile))
        .route("/users/history", get(users::watch_history))
        // videos
        .route("/videos", get(videos::list_videos).post(videos::publish_video))
        .route(
            "/videos/{videoId}",
            get(videos::get_video)
                .patch(videos::update_video)
                .delete(videos::delete_video),
        )
        .route("/videos/toggle/publish/{videoId}", patch(videos::toggle_publish))
        // comments
        .route(
            "/comments/{videoId}",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route(
            "/comments/c/{commentId}",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        // likes
        .route("/likes/toggle/v/{videoId}", post(likes::toggle_video_like))
        .route("/likes/toggle/c/{commentId}", post(likes::toggle_comment_like))
        .route("/likes/toggle/t/{tweetId}", post(likes::toggle_tweet_like))
        .route("/likes/videos", get(likes::liked_videos))
        // subscriptions
        .route(
            "/subscriptions/c/{channelId}",
            get(subscriptions::channel_subscribers).post(subscriptions::toggle_subscription),
        )
        .route("/subscriptions/subscribed", get(subscriptions::subscribed_channels))
        // tweets
        .route("/tweets", post(tweets::create_tweet))
        .route("/tweets/user/{userId}", get(tweets::user_tweets))
        .route(
            "/tweets/{tweetId}",
            patch(tweets::update_tweet).delete(tweets::delete_tweet),
        )
        // dashboard
        .route("/dashboard/stats/{channelId}", get(dashboard::channel_stats))
        .route("/dashboard/videos/{channelId}", get(dashboard::channel_videos))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let api = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state);

    Router::new().nest("/api/v1", api)
}
