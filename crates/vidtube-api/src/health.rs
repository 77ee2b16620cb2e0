use axum::response::IntoResponse;
use serde_json::json;

use crate::response::ApiResponse;

/// GET /healthcheck
pub async fn healthcheck() -> impl IntoResponse {
    ApiResponse::ok(json!({ "status": "OK" }), "Server is running smoothly")
}
