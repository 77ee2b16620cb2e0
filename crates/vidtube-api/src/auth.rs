use axum::{Extension, extract::State, response::IntoResponse};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::{debug, info, warn};

use vidtube_db::is_constraint_violation;
use vidtube_db::models::NewUser;
use vidtube_types::api::{ChangePasswordRequest, LoginRequest, LoginResponse, RefreshRequest};

use crate::error::ApiError;
use crate::extract::{ApiJson, non_blank};
use crate::media::{MediaAsset, upload_asset};
use crate::middleware::{ACCESS_COOKIE, CurrentUser, REFRESH_COOKIE};
use crate::password::{hash_password, verify_password};
use crate::response::{ApiResponse, empty};
use crate::state::{AppState, with_db};
use crate::upload::SpooledForm;

fn auth_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(true)
        .path("/")
        .build()
}

fn with_auth_cookies(jar: CookieJar, access: &str, refresh: &str) -> CookieJar {
    jar.add(auth_cookie(ACCESS_COOKIE, access.to_string()))
        .add(auth_cookie(REFRESH_COOKIE, refresh.to_string()))
}

/// Expiring cookies go out whether or not the request carried any.
fn expired_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = auth_cookie(name, String::new());
    cookie.make_removal();
    cookie
}

fn without_auth_cookies(jar: CookieJar) -> CookieJar {
    jar.add(expired_cookie(ACCESS_COOKIE))
        .add(expired_cookie(REFRESH_COOKIE))
}

/// POST /users/register (multipart)
pub async fn register(State(state): State<AppState>, form: SpooledForm) -> Result<impl IntoResponse, ApiError> {
    let full_name = form.text("fullName");
    let email = form.text("email").map(|e| e.to_lowercase());
    let username = form.text("username").map(|u| u.to_lowercase());
    let password = form.text("password");
    let (Some(full_name), Some(email), Some(username), Some(password)) = (full_name, email, username, password)
    else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    let exists = {
        let (username, email) = (username.clone(), email.clone());
        with_db(&state, move |db| db.user_exists(&username, &email)).await?
    };
    if exists {
        return Err(ApiError::conflict("User already exists"));
    }

    let avatar_file = form.require_file(MediaAsset::Avatar)?;
    let avatar = upload_asset(state.media.as_ref(), MediaAsset::Avatar, &avatar_file.path).await?;
    let cover_image = match form.file(MediaAsset::CoverImage) {
        // optional asset: a failed upload leaves the field empty
        Some(file) => upload_asset(state.media.as_ref(), MediaAsset::CoverImage, &file.path)
            .await
            .ok()
            .map(|uploaded| uploaded.url),
        None => None,
    };

    let password_hash = hash_password(password).await?;

    let created = with_db(&state, move |db| {
        db.create_user(&NewUser {
            username: &username,
            email: &email,
            full_name: &full_name,
            avatar: &avatar.url,
            cover_image: cover_image.as_deref(),
            password_hash: &password_hash,
        })
        .map(Some)
        .or_else(|e| if is_constraint_violation(&e) { Ok(None) } else { Err(e) })
    })
    .await?;
    let user = created.ok_or_else(|| ApiError::conflict("User already exists"))?;

    info!("Registered user {} ({})", user.username, user.id);
    Ok(ApiResponse::created(user, "User registered successfully"))
}

/// POST /users/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = non_blank(req.username).map(|u| u.to_lowercase());
    let email = non_blank(req.email).map(|e| e.to_lowercase());
    if username.is_none() && email.is_none() {
        return Err(ApiError::bad_request("Username or email is required"));
    }

    let credentials = with_db(&state, move |db| {
        db.find_credentials_by_login(username.as_deref(), email.as_deref())
    })
    .await?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !verify_password(req.password, credentials.password_hash).await? {
        debug!("Wrong password for {}", credentials.user.username);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let user = credentials.user;
    let pair = state.tokens.issue_pair(&user).map_err(anyhow::Error::from)?;
    {
        let refresh = pair.refresh_token.clone();
        let id = user.id;
        with_db(&state, move |db| db.set_refresh_token(id, Some(&refresh))).await?;
    }

    info!("User {} logged in", user.username);
    let jar = with_auth_cookies(jar, &pair.access_token, &pair.refresh_token);
    Ok((
        jar,
        ApiResponse::ok(
            LoginResponse {
                user,
                access_token: pair.access_token,
                refresh_token: pair.refresh_token,
            },
            "User logged in successfully",
        ),
    ))
}

/// POST /users/logout
pub async fn logout(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let id = caller.id();
    with_db(&state, move |db| db.set_refresh_token(id, None)).await?;

    info!("User {} logged out", caller.0.username);
    Ok((without_auth_cookies(jar), ApiResponse::ok(empty(), "User logged out successfully")))
}

/// POST /users/refresh-token. Token from the cookie, else the JSON body.
pub async fn refresh_token(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<ApiJson<RefreshRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| body.ok().and_then(|ApiJson(b)| non_blank(b.refresh_token)))
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let claims = state.tokens.verify_refresh(&presented).map_err(|e| {
        debug!("Rejected refresh token: {}", e);
        ApiError::unauthorized("Invalid refresh token")
    })?;

    let user = with_db(&state, move |db| db.get_user(claims.id))
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid refresh token"))?;

    let pair = state.tokens.issue_pair(&user).map_err(anyhow::Error::from)?;
    let rotated = {
        let replacement = pair.refresh_token.clone();
        let id = user.id;
        with_db(&state, move |db| db.rotate_refresh_token(id, &presented, &replacement)).await?
    };
    if !rotated {
        warn!("Stale refresh token presented for {}", user.username);
        return Err(ApiError::unauthorized("Refresh token is expired or used"));
    }

    debug!("Rotated refresh token for {}", user.username);
    let jar = with_auth_cookies(jar, &pair.access_token, &pair.refresh_token);
    Ok((jar, ApiResponse::ok(pair, "Access token refreshed")))
}

/// POST /users/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(caller): Extension<CurrentUser>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.new_password.trim().is_empty() {
        return Err(ApiError::bad_request("New password is required"));
    }

    let id = caller.id();
    let credentials = with_db(&state, move |db| db.get_credentials(id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    if !verify_password(req.old_password, credentials.password_hash).await? {
        return Err(ApiError::unauthorized("Invalid old password"));
    }

    let password_hash = hash_password(req.new_password).await?;
    with_db(&state, move |db| db.set_password_hash(id, &password_hash)).await?;

    info!("User {} changed password", caller.0.username);
    Ok(ApiResponse::ok(empty(), "Password changed successfully"))
}
