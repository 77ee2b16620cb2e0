use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;
use uuid::Uuid;

use vidtube_types::models::User;

use crate::error::ApiError;
use crate::state::{AppState, with_db};

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// The authenticated caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    pub fn id(&self) -> Uuid {
        self.0.id
    }
}

/// `accessToken` cookie first, then `Authorization: Bearer`.
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(token) = jar.get(ACCESS_COOKIE).map(|c| c.value()).filter(|v| !v.is_empty()) {
        return Some(token.to_string());
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Verify the access token and load the caller.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, ApiError> {
    let token = extract_access_token(req.headers()).ok_or_else(|| {
        debug!("Rejected {}: no access token", req.uri().path());
        ApiError::unauthorized("Unauthorized request")
    })?;

    let claims = state.tokens.verify_access(&token).map_err(|e| {
        debug!("Rejected access token: {}", e);
        ApiError::unauthorized("Invalid access token")
    })?;

    let user = with_db(&state, move |db| db.get_user(claims.id))
        .await?
        .ok_or_else(|| {
            debug!("Rejected access token: user no longer exists");
            ApiError::unauthorized("Invalid access token")
        })?;

    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
