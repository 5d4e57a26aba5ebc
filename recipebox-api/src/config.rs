//! Server configuration, read from the environment
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: Pool ceiling (default: 10)
//! - `API_HOST`: Host to bind to (default: 0.0.0.0)
//! - `API_PORT`: Port to bind to (default: 8080)
//! - `CORS_ORIGINS`: Comma-separated allowed origins, or `*` (default: *)
//! - `JWT_SECRET`: Secret key for token signing (required, 32+ chars)
//! - `JWT_TTL_HOURS`: Token lifetime (default: 24)
//! - `MEDIA_ROOT`: Directory for uploaded images (default: ./media)
//! - `MEDIA_URL`: URL prefix images are served under (default: /media)
//! - `MAX_UPLOAD_BYTES`: Largest accepted upload body (default: 10 MiB)
//! - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
//! - `RUST_LOG`: Log filter (default: recipebox_api=debug,tower_http=debug)
//!
//! # Example
//!
//! ```no_run
//! use recipebox_api::config::Config;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! println!("Listening on {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Settings for the server and the `createsuperuser` command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Token signing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// HS256 key, at least 32 bytes (`openssl rand -hex 32`)
    pub secret: String,

    pub ttl_hours: i64,
}

/// Where recipe images live and how they are served
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub root: PathBuf,

    /// Always starts with `/` and has no trailing slash
    pub url: String,

    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const MIN_SECRET_LEN: usize = 32;

/// Reads `key`, falling back to `default` when unset
fn var_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", key, raw, e)),
        Err(_) => Ok(default),
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{} environment variable is required", key))
}

impl Config {
    /// Reads the environment, after loading `.env` if one exists
    ///
    /// # Errors
    ///
    /// Fails when `DATABASE_URL` or `JWT_SECRET` is missing, the secret is
    /// too short, or any variable does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let secret = required("JWT_SECRET")?;
        if secret.len() < MIN_SECRET_LEN {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LEN);
        }

        let ttl_hours: i64 = var_or("JWT_TTL_HOURS", 24)?;
        if ttl_hours <= 0 {
            anyhow::bail!("JWT_TTL_HOURS must be positive");
        }

        let cors: String = var_or("CORS_ORIGINS", "*".to_string())?;
        let media_url: String = var_or("MEDIA_URL", "/media".to_string())?;

        Ok(Self {
            api: ApiConfig {
                host: var_or("API_HOST", "0.0.0.0".to_string())?,
                port: var_or("API_PORT", 8080)?,
                cors_origins: parse_origins(&cors),
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                max_connections: var_or("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            jwt: JwtConfig { secret, ttl_hours },
            media: MediaConfig {
                root: var_or("MEDIA_ROOT", PathBuf::from("./media"))?,
                url: normalize_media_url(&media_url),
                max_upload_bytes: var_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            },
            log_format: var_or("LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt.ttl_hours)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}

/// `media/` and `media` both become `/media`
fn normalize_media_url(raw: &str) -> String {
    format!("/{}", raw.trim().trim_matches('/'))
}
