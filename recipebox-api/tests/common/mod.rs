//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - Test database setup (skipped when DATABASE_URL is unset)
//! - Test user creation and bearer tokens
//! - Request helpers that drive the router directly

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use recipebox_api::app::{build_router, AppState};
use recipebox_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, LogFormat, MediaConfig};
use recipebox_shared::auth::jwt::issue_token;
use recipebox_shared::db::migrations::run_migrations;
use recipebox_shared::models::user::{CreateUser, User};
use serde_json::Value;
use sqlx::PgPool;
use std::io::Cursor;
use std::path::PathBuf;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "testpass123";

const MULTIPART_BOUNDARY: &str = "recipebox-test-boundary";

/// Test context containing all necessary resources
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
    pub config: Config,
    pub user: User,
    pub token: String,
}

impl TestContext {
    /// Connects to DATABASE_URL, migrates and creates a fresh user
    ///
    /// Returns `None` when DATABASE_URL is not set, so callers can skip.
    pub async fn new() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok()?;

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url,
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: "integration-test-secret-at-least-32-bytes".to_string(),
                ttl_hours: 1,
            },
            media: MediaConfig {
                root: std::env::temp_dir().join(format!("recipebox-media-{}", Uuid::new_v4())),
                url: "/media".to_string(),
                max_upload_bytes: 1024 * 1024,
            },
            log_format: LogFormat::Pretty,
        };

        let db = PgPool::connect(&config.database.url)
            .await
            .expect("Failed to connect to test database");
        run_migrations(&db).await.expect("Migrations failed");

        let app = build_router(AppState::new(db.clone(), config.clone()));

        let mut ctx = TestContext {
            db,
            app,
            config,
            user: placeholder_user(),
            token: String::new(),
        };
        let (user, token) = ctx.create_user().await;
        ctx.user = user;
        ctx.token = token;

        Some(ctx)
    }

    /// Creates another regular user and a token for them
    pub async fn create_user(&self) -> (User, String) {
        let email = format!("test-{}@example.com", Uuid::new_v4());
        let user = User::create_user(
            &self.db,
            CreateUser::new(email, TEST_PASSWORD).with_name("Test Name"),
        )
        .await
        .expect("Failed to create user");

        let token = self.token_for(&user);
        (user, token)
    }

    /// Creates a staff user and a token for them
    pub async fn create_staff(&self) -> (User, String) {
        let email = format!("admin-{}@example.com", Uuid::new_v4());
        let user = User::create_superuser(&self.db, CreateUser::new(email, TEST_PASSWORD))
            .await
            .expect("Failed to create superuser");

        let token = self.token_for(&user);
        (user, token)
    }

    pub fn token_for(&self, user: &User) -> String {
        issue_token(
            user.id,
            &self.config.jwt.secret,
            chrono::Duration::hours(self.config.jwt.ttl_hours),
        )
        .expect("Failed to issue token")
    }

    /// Sends a JSON request as the context user
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(Some(&self.token), method, uri, body).await
    }

    /// Sends a JSON request with an optional bearer token
    pub async fn send_as(
        &self,
        token: Option<&str>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.dispatch(request).await
    }

    /// Posts a multipart form with one file field
    pub async fn upload(
        &self,
        uri: &str,
        field: &str,
        filename: &str,
        bytes: &[u8],
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        self.dispatch(request).await
    }

    async fn dispatch(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        (status, value)
    }

    /// Absolute path of a stored image given its `/media/...` URL
    pub fn media_path(&self, url: &str) -> PathBuf {
        let relative = url
            .trim_start_matches(&self.config.media.url)
            .trim_start_matches('/');
        self.config.media.root.join(relative)
    }

    /// Creates a recipe through the API and returns its JSON
    pub async fn create_recipe(&self, payload: Value) -> Value {
        let (status, body) = self.send(Method::POST, "/v1/recipes/", Some(payload)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body
    }
}

fn placeholder_user() -> User {
    User {
        id: 0,
        email: String::new(),
        password_hash: String::new(),
        name: String::new(),
        is_active: true,
        is_staff: false,
        is_superuser: false,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    }
}

/// A small valid PNG
pub fn png_bytes() -> Vec<u8> {
    let img = image::DynamicImage::new_rgb8(10, 10);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Sample recipe payload with the required fields
pub fn sample_recipe(title: &str) -> Value {
    serde_json::json!({
        "title": title,
        "time_minutes": 22,
        "price": "5.25",
    })
}

/// Ids from a JSON array of objects
pub fn ids(list: &Value) -> Vec<i64> {
    list.as_array()
        .map(|items| items.iter().filter_map(|item| item["id"].as_i64()).collect())
        .unwrap_or_default()
}

/// Names from a JSON array of `{id, name}` objects
pub fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
