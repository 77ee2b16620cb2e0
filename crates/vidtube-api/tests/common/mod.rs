#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use chrono::Duration;
use futures_util::future::BoxFuture;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use vidtube_api::media::{MediaUploader, UploadedMedia};
use vidtube_api::tokens::TokenService;
use vidtube_api::{AppStateInner, router};
use vidtube_db::Database;

pub const BOUNDARY: &str = "vidtube-test-boundary";

/// Hands out fake hosted URLs. `fail` rejects every upload, `fail_extension`
/// only files with that extension.
#[derive(Default)]
pub struct StubUploader {
    pub fail: bool,
    pub fail_extension: Option<&'static str>,
}

impl MediaUploader for StubUploader {
    fn upload<'a>(&'a self, local_path: &'a Path) -> BoxFuture<'a, Option<UploadedMedia>> {
        Box::pin(async move {
            let rejected = self
                .fail_extension
                .is_some_and(|ext| local_path.extension().is_some_and(|e| e == ext));
            if self.fail || rejected || !local_path.exists() {
                return None;
            }
            let name = local_path.file_name()?.to_string_lossy().into_owned();
            Some(UploadedMedia {
                url: format!("https://media.test/{name}"),
                duration: Some(12.5),
            })
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub spool_dir: PathBuf,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_uploader(StubUploader::default())
    }

    pub fn with_uploader(uploader: StubUploader) -> Self {
        let spool_dir = std::env::temp_dir().join(format!("vidtube-spool-{}", Uuid::new_v4()));
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            tokens: TokenService::new("test-access-secret", "test-refresh-secret", Duration::minutes(15), Duration::days(7)),
            media: Arc::new(uploader),
            upload_dir: spool_dir.clone(),
        });
        Self {
            router: router(state, 16 * 1024 * 1024),
            spool_dir,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value, HeaderMap) {
        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body, headers)
    }

    /// Registers `username` with password `p1` and an avatar.
    pub async fn register(&self, username: &str) -> Value {
        let email = format!("{username}@x.com");
        let req = multipart_request(
            "POST",
            "/api/v1/users/register",
            None,
            &[
                ("fullName", username),
                ("email", &email),
                ("username", username),
                ("password", "p1"),
            ],
            &[("avatar", "face.png", b"png-bytes")],
        );
        let (status, body, _) = self.send(req).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    /// Logs in and returns `(access_token, refresh_token)`.
    pub async fn login(&self, username: &str) -> (String, String) {
        let (status, body, _) = self
            .send(json_request(
                "POST",
                "/api/v1/users/login",
                None,
                json!({ "username": username, "password": "p1" }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        (
            body["data"]["accessToken"].as_str().unwrap().to_string(),
            body["data"]["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    /// Registers and logs in; returns `(user_id, access_token)`.
    pub async fn signed_in(&self, username: &str) -> (String, String) {
        let user = self.register(username).await;
        let (access, _) = self.login(username).await;
        (user["id"].as_str().unwrap().to_string(), access)
    }

    pub async fn publish_video(&self, token: &str, title: &str) -> Value {
        let req = multipart_request(
            "POST",
            "/api/v1/videos",
            Some(token),
            &[("title", title), ("description", "a video")],
            &[("videoFile", "clip.mp4", b"mp4-bytes"), ("thumbnail", "thumb.jpg", b"jpg-bytes")],
        );
        let (status, body, _) = self.send(req).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }

    pub fn spooled_files(&self) -> usize {
        std::fs::read_dir(&self.spool_dir).map(|entries| entries.count()).unwrap_or(0)
    }
}

fn with_auth(builder: axum::http::request::Builder, token: Option<&str>) -> axum::http::request::Builder {
    match token {
        Some(token) => builder.header(header::AUTHORIZATION, format!("Bearer {token}")),
        None => builder,
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    with_auth(Request::builder().method(method).uri(uri), token)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    with_auth(Request::builder().method(method).uri(uri), token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn multipart_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    with_auth(Request::builder().method(method).uri(uri), token)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}
