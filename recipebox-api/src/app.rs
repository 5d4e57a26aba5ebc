/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use recipebox_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = recipebox_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, routes};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put, MethodRouter},
    Extension, Router,
};
use recipebox_shared::{
    auth::{
        jwt,
        middleware::{parse_bearer, AuthContext, AuthError},
    },
    models::user::User,
    storage::{ImageStore, LocalImageStore},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Where uploaded recipe images are kept
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    /// Creates application state with images on the local filesystem
    pub fn new(db: PgPool, config: Config) -> Self {
        let images = LocalImageStore::new(config.media.root.clone(), config.media.url.clone());
        Self::with_image_store(db, config, Arc::new(images))
    }

    /// Creates application state with a custom image store
    pub fn with_image_store(db: PgPool, config: Config, images: Arc<dyn ImageStore>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            images,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Registers `method_router` at `path` with and without a trailing slash
fn route_both(
    router: Router<AppState>,
    path: &str,
    method_router: MethodRouter<AppState>,
) -> Router<AppState> {
    let bare = path.trim_end_matches('/');
    router
        .route(bare, method_router.clone())
        .route(&format!("{}/", bare), method_router)
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// ├── /media/...                       # Uploaded images (public)
/// └── /v1/
///     ├── POST /users/                 # Register (public)
///     ├── POST /users/token/           # Obtain token (public)
///     ├── /users/me/                   # Own profile
///     ├── /recipes/                    # Recipes (owner-scoped)
///     │   ├── /:id/
///     │   └── /:id/upload-image/
///     ├── /tags/, /tags/:id/
///     ├── /ingredients/, /ingredients/:id/
///     └── /admin/...                   # Staff only
/// ```
///
/// Every path also matches without its trailing slash.
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication, and the staff check for admin routes (per-route)
pub fn build_router(state: AppState) -> Router {
    let max_upload = state.config.media.max_upload_bytes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Registration and token exchange (public)
    let mut public_routes = Router::new();
    public_routes = route_both(public_routes, "/v1/users", post(routes::users::register));
    public_routes = route_both(public_routes, "/v1/users/token", post(routes::users::create_token));

    // Owner-scoped routes (require a valid token)
    let mut user_routes = Router::new();
    user_routes = route_both(
        user_routes,
        "/v1/users/me",
        get(routes::users::me)
            .put(routes::users::replace_me)
            .patch(routes::users::update_me),
    );
    user_routes = route_both(
        user_routes,
        "/v1/recipes",
        get(routes::recipes::list_recipes).post(routes::recipes::create_recipe),
    );
    user_routes = route_both(
        user_routes,
        "/v1/recipes/:id",
        get(routes::recipes::get_recipe)
            .put(routes::recipes::replace_recipe)
            .patch(routes::recipes::update_recipe)
            .delete(routes::recipes::delete_recipe),
    );
    user_routes = route_both(
        user_routes,
        "/v1/recipes/:id/upload-image",
        post(routes::recipes::upload_image).layer(DefaultBodyLimit::max(max_upload)),
    );
    user_routes = route_both(user_routes, "/v1/tags", get(routes::tags::list_tags));
    user_routes = route_both(
        user_routes,
        "/v1/tags/:id",
        put(routes::tags::update_tag)
            .patch(routes::tags::update_tag)
            .delete(routes::tags::delete_tag),
    );
    user_routes = route_both(
        user_routes,
        "/v1/ingredients",
        get(routes::ingredients::list_ingredients),
    );
    user_routes = route_both(
        user_routes,
        "/v1/ingredients/:id",
        put(routes::ingredients::update_ingredient)
            .patch(routes::ingredients::update_ingredient)
            .delete(routes::ingredients::delete_ingredient),
    );
    let user_routes = user_routes.route_layer(middleware::from_fn_with_state(
        state.clone(),
        jwt_auth_layer,
    ));

    // Admin routes (require a valid token and the staff flag)
    let mut admin_routes = Router::new();
    admin_routes = route_both(
        admin_routes,
        "/v1/admin/users",
        get(routes::admin::list_users).post(routes::admin::create_user),
    );
    admin_routes = route_both(
        admin_routes,
        "/v1/admin/users/:id",
        get(routes::admin::get_user).patch(routes::admin::update_user),
    );
    admin_routes = route_both(admin_routes, "/v1/admin/recipes", get(routes::admin::list_recipes));
    admin_routes = route_both(admin_routes, "/v1/admin/tags", get(routes::admin::list_tags));
    admin_routes = route_both(
        admin_routes,
        "/v1/admin/ingredients",
        get(routes::admin::list_ingredients),
    );
    let admin_routes = admin_routes
        .route_layer(middleware::from_fn(staff_only_layer))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let media = ServeDir::new(&state.config.media.root);
    let media_url = state.config.media.url.clone();

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .nest_service(&media_url, media)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the bearer token, loads the user it names and injects an
/// [`AuthContext`] into the request extensions. Unknown and inactive users
/// are rejected, so a token stops working as soon as its user is
/// deactivated.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Header is not valid ASCII".to_string()))?;

    let token = parse_bearer(auth_header)?;
    let claims = jwt::validate_token(token, state.jwt_secret())?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;
    let auth_context = AuthContext::from_user(&user)?;

    tracing::debug!(user_id = auth_context.user_id, "Authenticated request");

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Rejects authenticated callers without the staff flag
async fn staff_only_layer(
    Extension(auth): Extension<AuthContext>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !auth.can_administer() {
        tracing::warn!(user_id = auth.user_id, "Non-staff user denied admin access");
        return Err(ApiError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_route_both_matches_with_and_without_slash() {
        let router = route_both(Router::new(), "/v1/things/", get(|| async { "ok" }));
        let app: Router = router.with_state::<()>(test_state_placeholder());

        for uri in ["/v1/things", "/v1/things/"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    fn test_state_placeholder() -> AppState {
        let config = crate::config::tests::test_config();
        let db = PgPool::connect_lazy(&config.database.url).unwrap();
        AppState::new(db, config)
    }

    #[tokio::test]
    async fn test_protected_route_requires_token() {
        let app = build_router(test_state_placeholder());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/recipes/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_authorization_header_is_unauthorized() {
        let app = build_router(test_state_placeholder());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/v1/tags/")
                    .header(header::AUTHORIZATION, "Basic abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
