/// User endpoints
///
/// # Endpoints
///
/// - `POST /v1/users/` - Register a new user
/// - `POST /v1/users/token/` - Exchange credentials for a bearer token
/// - `GET /v1/users/me/` - Own profile
/// - `PUT /v1/users/me/` - Replace own profile
/// - `PATCH /v1/users/me/` - Update own profile

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::Json,
};
use axum::{extract::State, http::StatusCode, Extension};
use recipebox_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::user::{CreateUser, UpdateUser, User},
};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

/// Rejects passwords shorter than [`password::MIN_PASSWORD_LENGTH`]
pub(crate) fn validate_password_length(value: &str) -> Result<(), ValidationError> {
    if value.chars().count() >= password::MIN_PASSWORD_LENGTH {
        return Ok(());
    }

    let mut error = ValidationError::new("length");
    error.message = Some(Cow::Owned(format!(
        "Ensure this field has at least {} characters.",
        password::MIN_PASSWORD_LENGTH
    )));
    Err(error)
}

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(custom(function = "validate_password_length"))]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,
}

/// Public view of a user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// Token request
#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub email: String,

    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub password: String,
}

/// Token response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Profile update; every field optional
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    #[validate(custom(function = "validate_password_length"))]
    pub password: Option<String>,

    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/users/
/// Content-Type: application/json
///
/// {
///   "email": "test@example.com",
///   "password": "testpass123",
///   "name": "Test Name"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with `{ "id", "email", "name" }`. The password is never
/// returned.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, axum::Json<UserResponse>)> {
    req.validate()?;

    let user = User::create_user(
        &state.db,
        CreateUser::new(req.email, req.password).with_name(req.name),
    )
    .await?;

    tracing::info!(user_id = user.id, "User registered");

    Ok((StatusCode::CREATED, axum::Json(user.into())))
}

/// Exchange email and password for a bearer token
///
/// Unknown email, wrong password and inactive account all produce the same
/// `400` so the response does not reveal which accounts exist.
pub async fn create_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> ApiResult<axum::Json<TokenResponse>> {
    req.validate()?;

    let user = User::authenticate(&state.db, &req.email, &req.password)
        .await?
        .ok_or_else(|| {
            ApiError::BadRequest("Unable to authenticate with provided credentials".to_string())
        })?;

    let token = jwt::issue_token(user.id, state.jwt_secret(), state.config.token_ttl())?;

    tracing::info!(user_id = user.id, "Token issued");

    Ok(axum::Json(TokenResponse { token }))
}

/// Returns the authenticated user's profile
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<axum::Json<UserResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(axum::Json(user.into()))
}

/// Replaces the authenticated user's profile
///
/// `email` and `password` are required; `name` defaults to empty.
pub async fn replace_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<axum::Json<UserResponse>> {
    let mut missing = Vec::new();
    if req.email.is_none() {
        missing.push("email");
    }
    if req.password.is_none() {
        missing.push("password");
    }
    if !missing.is_empty() {
        return Err(ApiError::ValidationError(
            missing
                .into_iter()
                .map(|field| crate::error::ValidationErrorDetail {
                    field: field.to_string(),
                    message: "This field is required.".to_string(),
                })
                .collect(),
        ));
    }

    let req = UpdateMeRequest {
        name: Some(req.name.unwrap_or_default()),
        ..req
    };
    apply_update(&state, auth.user_id, req).await
}

/// Updates the supplied fields of the authenticated user's profile
///
/// A new password is hashed before it is stored.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<axum::Json<UserResponse>> {
    apply_update(&state, auth.user_id, req).await
}

async fn apply_update(
    state: &AppState,
    user_id: i64,
    req: UpdateMeRequest,
) -> ApiResult<axum::Json<UserResponse>> {
    req.validate()?;

    let password_hash = req
        .password
        .as_deref()
        .map(password::hash_password)
        .transpose()?;

    let user = User::update(
        &state.db,
        user_id,
        UpdateUser {
            email: req.email,
            password_hash,
            name: req.name,
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id, "Profile updated");

    Ok(axum::Json(user.into()))
}
