//! API error type and its JSON body
//!
//! Every handler returns [`ApiResult`]. Errors render as
//! `{"error": <code>, "message": <text>, "details": [...]}` where `details`
//! is present only for field validation failures.
//!
//! ```
//! use recipebox_api::error::{ApiError, ApiResult};
//! use axum::Json;
//! use serde_json::json;
//!
//! async fn handler(id: i64) -> ApiResult<Json<serde_json::Value>> {
//!     if id < 0 {
//!         return Err(ApiError::NotFound("Recipe not found".to_string()));
//!     }
//!     Ok(Json(json!({ "id": id })))
//! }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use recipebox_shared::{
    auth::{jwt::JwtError, middleware::AuthError, password::PasswordError},
    filters::FilterError,
    models::user::UserError,
    storage::StorageError,
};
use serde::{Deserialize, Serialize};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing, malformed or rejected credentials
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but lacking the staff flag
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Absent, or owned by another user
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint hit (email, tag or ingredient name)
    #[error("conflict: {0}")]
    Conflict(String),

    /// One or more fields rejected; rendered as 400 with `details`
    #[error("{} invalid field(s)", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),

    #[error("internal error: {0}")]
    InternalError(String),

    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    /// A single-field validation error
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: field.to_string(),
            message: message.into(),
        }])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable code placed in the `error` field
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Conflict(_) => "conflict",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::InternalError(_) => "internal_error",
            ApiError::ServiceUnavailable(_) => "service_unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,
    pub message: String,
}

/// Body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            ApiError::ValidationError(errors) => ("Invalid input.".to_string(), Some(errors)),
            ApiError::InternalError(msg) => {
                // The cause is logged, never returned
                tracing::error!(error = %msg, "Request failed");
                ("An internal error occurred".to_string(), None)
            }
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::ServiceUnavailable(msg) => (msg, None),
        };

        let body = ErrorResponse {
            error: code.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if let Some(constraint) = db_err.constraint() {
                    return match constraint {
                        "users_email_key" => {
                            ApiError::Conflict("A user with this email already exists".to_string())
                        }
                        "tags_user_id_name_key" => {
                            ApiError::Conflict("A tag with this name already exists".to_string())
                        }
                        "ingredients_user_id_name_key" => ApiError::Conflict(
                            "An ingredient with this name already exists".to_string(),
                        ),
                        other if db_err.is_check_violation() => {
                            ApiError::BadRequest(format!("Value out of range: {}", other))
                        }
                        other => ApiError::Conflict(format!("Constraint violation: {}", other)),
                    };
                }

                // Other database errors are internal
                ApiError::InternalError(format!("Database error: {}", db_err))
            }
            sqlx::Error::PoolTimedOut => {
                ApiError::ServiceUnavailable("Database is not reachable".to_string())
            }
            _ => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

/// Convert auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(jwt_err) => jwt_err.into(),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Convert JWT errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer => ApiError::Unauthorized("Invalid token issuer".to_string()),
            JwtError::CreateError(msg) => {
                ApiError::InternalError(format!("Failed to create token: {}", msg))
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::MissingEmail => ApiError::invalid_field("email", err.to_string()),
            UserError::Password(e) => e.into(),
            UserError::Database(e) => e.into(),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        let field = match &err {
            FilterError::InvalidId { param, .. } | FilterError::InvalidFlag { param, .. } => {
                param.clone()
            }
        };
        ApiError::invalid_field(&field, err.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => ApiError::InternalError(format!("Storage error: {}", e)),
            other => ApiError::invalid_field("image", other.to_string()),
        }
    }
}

/// Flattens `validator` field errors into response details
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors: Vec<ValidationErrorDetail> = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();

        errors.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(errors)
    }
}
