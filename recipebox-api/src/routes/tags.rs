/// Tag endpoints
///
/// Tags are created through recipe payloads; there is no create endpoint.
///
/// # Endpoints
///
/// - `GET /v1/tags/` - List own tags (`?assigned_only=1`)
/// - `PUT /v1/tags/:id/`, `PATCH /v1/tags/:id/` - Rename a tag
/// - `DELETE /v1/tags/:id/` - Delete a tag

use super::labels::{self, LabelListParams, LabelPayload, LabelResponse};
use crate::{
    app::AppState,
    error::ApiResult,
    extract::{Json, Path, Query},
};
use axum::{extract::State, http::StatusCode, Extension};
use recipebox_shared::{auth::middleware::AuthContext, models::tag::Tag};

/// List the caller's tags, ordered by name descending
pub async fn list_tags(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<LabelListParams>,
) -> ApiResult<axum::Json<Vec<LabelResponse>>> {
    Ok(axum::Json(labels::list::<Tag>(&state, &auth, params).await?))
}

/// Rename a tag
///
/// # Errors
///
/// - `404 Not Found`: No such tag for this user
/// - `409 Conflict`: The user already has a tag with that name
pub async fn update_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<LabelPayload>,
) -> ApiResult<axum::Json<LabelResponse>> {
    Ok(axum::Json(labels::rename::<Tag>(&state, &auth, id, payload).await?))
}

/// Delete a tag; recipes that used it lose the association
pub async fn delete_tag(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    labels::delete::<Tag>(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
