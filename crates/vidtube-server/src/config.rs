use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Duration;

/// Secrets that ship in sample `.env` files and must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,

    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,

    /// Spool directory for incoming multipart files.
    pub upload_dir: PathBuf,
    /// Used by the local uploader when Cloudinary is not configured.
    pub media_dir: PathBuf,
    pub public_url: String,
    pub cloudinary: Option<CloudinaryConfig>,

    /// `None` means permissive CORS.
    pub cors_origin: Option<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // blank values count as unset
        let present = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        let var = |key: &str, default: &str| present(key).unwrap_or_else(|| default.to_string());

        let access_token_secret = get("ACCESS_TOKEN_SECRET").unwrap_or_default();
        let refresh_token_secret = get("REFRESH_TOKEN_SECRET").unwrap_or_default();
        check_secrets(&access_token_secret, &refresh_token_secret)?;

        let cloudinary = match (
            present("CLOUDINARY_CLOUD_NAME"),
            present("CLOUDINARY_API_KEY"),
            present("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        let max_upload_mb: usize = var("VIDTUBE_MAX_UPLOAD_MB", "512")
            .parse()
            .context("VIDTUBE_MAX_UPLOAD_MB must be a whole number")?;

        Ok(Self {
            host: var("VIDTUBE_HOST", "0.0.0.0"),
            port: var("VIDTUBE_PORT", "8000").parse().context("VIDTUBE_PORT must be a port number")?,
            db_path: var("VIDTUBE_DB_PATH", "vidtube.db").into(),
            access_token_ttl: parse_expiry(&var("ACCESS_TOKEN_EXPIRY", "15m")).context("ACCESS_TOKEN_EXPIRY")?,
            refresh_token_ttl: parse_expiry(&var("REFRESH_TOKEN_EXPIRY", "7d")).context("REFRESH_TOKEN_EXPIRY")?,
            access_token_secret,
            refresh_token_secret,
            upload_dir: var("VIDTUBE_UPLOAD_DIR", "./public/temp").into(),
            media_dir: var("VIDTUBE_MEDIA_DIR", "./public/media").into(),
            public_url: var("VIDTUBE_PUBLIC_URL", "http://localhost:8000"),
            cloudinary,
            cors_origin: present("VIDTUBE_CORS_ORIGIN"),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        })
    }
}

fn check_secrets(access: &str, refresh: &str) -> Result<()> {
    for (name, secret) in [("ACCESS_TOKEN_SECRET", access), ("REFRESH_TOKEN_SECRET", refresh)] {
        if secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&secret) {
            bail!("{} is unset or still a placeholder", name);
        }
    }
    if access == refresh {
        bail!("ACCESS_TOKEN_SECRET and REFRESH_TOKEN_SECRET must differ");
    }
    Ok(())
}

/// `15m`, `7d`, `12h`, `30s`, or bare seconds.
pub fn parse_expiry(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&raw[..idx], c),
        Some(_) => (raw, 's'),
        None => bail!("empty expiry"),
    };
    let n: i64 = digits
        .trim()
        .parse()
        .with_context(|| format!("invalid expiry {:?}", raw))?;
    if n <= 0 {
        bail!("expiry must be positive, got {:?}", raw);
    }

    let duration = match unit.to_ascii_lowercase() {
        's' => Duration::try_seconds(n),
        'm' => Duration::try_minutes(n),
        'h' => Duration::try_hours(n),
        'd' => Duration::try_days(n),
        other => bail!("unknown expiry unit {:?} in {:?}", other, raw),
    };
    duration.with_context(|| format!("expiry {:?} out of range", raw))
}
