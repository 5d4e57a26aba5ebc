/// Handlers shared by the tag and ingredient endpoints
///
/// Both resources are listed, renamed and deleted the same way; the
/// per-resource modules pick the [`Label`] type.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use recipebox_shared::{
    auth::middleware::AuthContext,
    filters::parse_flag,
    models::label::{self, Label},
    reconcile::deserialize_trimmed,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query parameters for tag and ingredient lists
#[derive(Debug, Default, Deserialize)]
pub struct LabelListParams {
    /// `1` keeps only entries attached to at least one recipe
    pub assigned_only: Option<String>,
}

/// Rename payload; the name is trimmed before it is validated
#[derive(Debug, Deserialize, Validate)]
pub struct LabelPayload {
    #[serde(deserialize_with = "deserialize_trimmed")]
    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters."))]
    pub name: String,
}

/// A tag or ingredient as returned by its own endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelResponse {
    pub id: i64,
    pub name: String,
}

impl LabelResponse {
    pub fn from_label<T: Label>(label: &T) -> Self {
        Self {
            id: label.id(),
            name: label.name().to_string(),
        }
    }
}

fn not_found<T: Label>() -> ApiError {
    ApiError::NotFound(format!("{} not found", T::KIND))
}

pub async fn list<T: Label>(
    state: &AppState,
    auth: &AuthContext,
    params: LabelListParams,
) -> ApiResult<Vec<LabelResponse>> {
    let assigned_only = params
        .assigned_only
        .as_deref()
        .map(|raw| parse_flag("assigned_only", raw))
        .transpose()?
        .unwrap_or(false);

    let labels = label::list_for_user::<T>(&state.db, auth.user_id, assigned_only).await?;
    Ok(labels.iter().map(LabelResponse::from_label).collect())
}

pub async fn rename<T: Label>(
    state: &AppState,
    auth: &AuthContext,
    id: i64,
    payload: LabelPayload,
) -> ApiResult<LabelResponse> {
    payload.validate()?;

    let renamed = label::rename::<T, _>(&state.db, id, auth.user_id, &payload.name)
        .await?
        .ok_or_else(not_found::<T>)?;

    tracing::info!(kind = T::KIND, id, user_id = auth.user_id, "Renamed");

    Ok(LabelResponse::from_label(&renamed))
}

pub async fn delete<T: Label>(state: &AppState, auth: &AuthContext, id: i64) -> ApiResult<()> {
    if !label::delete_for_user::<T, _>(&state.db, id, auth.user_id).await? {
        return Err(not_found::<T>());
    }

    tracing::info!(kind = T::KIND, id, user_id = auth.user_id, "Deleted");
    Ok(())
}
