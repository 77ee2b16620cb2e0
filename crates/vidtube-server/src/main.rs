mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderValue, Method, header::{AUTHORIZATION, CONTENT_TYPE}};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use vidtube_api::media::{CloudinaryUploader, LocalUploader, MediaUploader};
use vidtube_api::tokens::TokenService;
use vidtube_api::{AppStateInner, router};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vidtube=debug,vidtube_api=debug,vidtube_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET in your .env file and restart.");
            std::process::exit(1);
        }
    };

    let db = vidtube_db::Database::open(&config.db_path)?;

    let media: Arc<dyn MediaUploader> = match &config.cloudinary {
        Some(c) => {
            info!("Media uploads go to Cloudinary cloud {}", c.cloud_name);
            Arc::new(CloudinaryUploader::new(c.cloud_name.clone(), c.api_key.clone(), c.api_secret.clone()))
        }
        None => {
            info!("Cloudinary not configured, storing media locally");
            Arc::new(LocalUploader::new(config.media_dir.clone(), &config.public_url).await?)
        }
    };

    let state = Arc::new(AppStateInner {
        db,
        tokens: TokenService::new(
            &config.access_token_secret,
            &config.refresh_token_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        ),
        media,
        upload_dir: config.upload_dir.clone(),
    });

    // credentialed CORS requires an exact origin
    let cors = match &config.cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(HeaderValue::from_str(origin)?))
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::permissive(),
    };

    let app = router(state, config.max_upload_bytes)
        .nest_service("/media", ServeDir::new(&config.media_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("VidTube server listening on {}", addr);
    info!("Upload limit: {} MB", config.max_upload_bytes / (1024 * 1024));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
