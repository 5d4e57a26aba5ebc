/// Ingredient endpoints
///
/// # Endpoints
///
/// - `GET /v1/ingredients/` - List own ingredients (`?assigned_only=1`)
/// - `PUT /v1/ingredients/:id/`, `PATCH /v1/ingredients/:id/` - Rename
/// - `DELETE /v1/ingredients/:id/` - Delete

use super::labels::{self, LabelListParams, LabelPayload, LabelResponse};
use crate::{
    app::AppState,
    error::ApiResult,
    extract::{Json, Path, Query},
};
use axum::{extract::State, http::StatusCode, Extension};
use recipebox_shared::{auth::middleware::AuthContext, models::ingredient::Ingredient};

pub async fn list_ingredients(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<LabelListParams>,
) -> ApiResult<axum::Json<Vec<LabelResponse>>> {
    Ok(axum::Json(labels::list::<Ingredient>(&state, &auth, params).await?))
}

pub async fn update_ingredient(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<LabelPayload>,
) -> ApiResult<axum::Json<LabelResponse>> {
    Ok(axum::Json(
        labels::rename::<Ingredient>(&state, &auth, id, payload).await?,
    ))
}

pub async fn delete_ingredient(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    labels::delete::<Ingredient>(&state, &auth, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
