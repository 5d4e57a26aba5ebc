/// Staff-only administration endpoints
///
/// Lists every row regardless of owner and manages user accounts. The
/// router wraps these handlers in the auth layer and a staff check, so
/// they run only for callers with `is_staff`.
///
/// # Endpoints
///
/// - `GET /v1/admin/users/` - All users
/// - `POST /v1/admin/users/` - Create a user, optionally a superuser
/// - `GET /v1/admin/users/:id/` - One user
/// - `PATCH /v1/admin/users/:id/` - Change name, active or staff flags
/// - `GET /v1/admin/recipes/` - All recipes with their owner
/// - `GET /v1/admin/tags/` - All tags with their owner
/// - `GET /v1/admin/ingredients/` - All ingredients with their owner

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path},
};
use axum::{extract::State, http::StatusCode, Extension};
use chrono::{DateTime, Utc};
use recipebox_shared::{
    auth::middleware::AuthContext,
    models::{
        ingredient::Ingredient,
        label::{self, Label},
        recipe::Recipe,
        tag::Tag,
        user::{CreateUser, NewUser, UpdateUser, User},
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A user as seen by staff
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminUserResponse {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for AdminUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            is_active: user.is_active,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Account creation by staff
#[derive(Debug, Deserialize, Validate)]
pub struct AdminCreateUserRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(custom(function = "crate::routes::users::validate_password_length"))]
    pub password: String,

    #[serde(default)]
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: String,

    #[serde(default)]
    pub is_staff: bool,

    /// Also implies `is_staff`
    #[serde(default)]
    pub is_superuser: bool,
}

/// Account changes by staff
#[derive(Debug, Default, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
}

/// A recipe with its owner
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminRecipeResponse {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
}

impl From<Recipe> for AdminRecipeResponse {
    fn from(recipe: Recipe) -> Self {
        Self {
            id: recipe.id,
            user_id: recipe.user_id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            image: recipe.image,
        }
    }
}

/// A tag or ingredient with its owner
#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLabelResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

pub async fn list_users(State(state): State<AppState>) -> ApiResult<axum::Json<Vec<AdminUserResponse>>> {
    let users = User::list(&state.db).await?;
    Ok(axum::Json(users.into_iter().map(Into::into).collect()))
}

/// Create a user account
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `409 Conflict`: Email already exists
pub async fn create_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AdminCreateUserRequest>,
) -> ApiResult<(StatusCode, axum::Json<AdminUserResponse>)> {
    req.validate()?;

    let data = CreateUser::new(req.email, req.password).with_name(req.name);
    let new_user = if req.is_superuser {
        NewUser::superuser(data)?
    } else {
        let mut new_user = NewUser::regular(data)?;
        new_user.is_staff = req.is_staff;
        new_user
    };

    let user = User::insert(&state.db, new_user).await?;

    tracing::info!(
        user_id = user.id,
        created_by = auth.user_id,
        is_staff = user.is_staff,
        "User created by staff"
    );

    Ok((StatusCode::CREATED, axum::Json(user.into())))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<axum::Json<AdminUserResponse>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(axum::Json(user.into()))
}

/// Change a user's name, active flag or staff flag
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(req): Json<AdminUpdateUserRequest>,
) -> ApiResult<axum::Json<AdminUserResponse>> {
    req.validate()?;

    let user = User::update(
        &state.db,
        id,
        UpdateUser {
            name: req.name,
            is_active: req.is_active,
            is_staff: req.is_staff,
            ..Default::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = id, updated_by = auth.user_id, "User updated by staff");

    Ok(axum::Json(user.into()))
}

pub async fn list_recipes(
    State(state): State<AppState>,
) -> ApiResult<axum::Json<Vec<AdminRecipeResponse>>> {
    let recipes = Recipe::list_all(&state.db).await?;
    Ok(axum::Json(recipes.into_iter().map(Into::into).collect()))
}

async fn list_labels<T: Label>(state: &AppState) -> ApiResult<Vec<AdminLabelResponse>> {
    let labels = label::list_all::<T>(&state.db).await?;
    Ok(labels
        .iter()
        .map(|l| AdminLabelResponse {
            id: l.id(),
            user_id: l.user_id(),
            name: l.name().to_string(),
        })
        .collect())
}

pub async fn list_tags(
    State(state): State<AppState>,
) -> ApiResult<axum::Json<Vec<AdminLabelResponse>>> {
    Ok(axum::Json(list_labels::<Tag>(&state).await?))
}

pub async fn list_ingredients(
    State(state): State<AppState>,
) -> ApiResult<axum::Json<Vec<AdminLabelResponse>>> {
    Ok(axum::Json(list_labels::<Ingredient>(&state).await?))
}
