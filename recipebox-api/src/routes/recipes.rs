/// Recipe endpoints
///
/// Every handler scopes its query to the authenticated user; a recipe owned
/// by someone else answers 404 exactly like a missing one.
///
/// # Endpoints
///
/// - `GET /v1/recipes/` - List own recipes, optionally filtered
/// - `POST /v1/recipes/` - Create a recipe
/// - `GET /v1/recipes/:id/` - Recipe detail
/// - `PUT /v1/recipes/:id/` - Replace a recipe
/// - `PATCH /v1/recipes/:id/` - Partially update a recipe
/// - `DELETE /v1/recipes/:id/` - Delete a recipe
/// - `POST /v1/recipes/:id/upload-image/` - Upload a recipe image

use std::borrow::Cow;

use super::labels::LabelResponse;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{Json, Path, Query},
};
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Extension,
};
use recipebox_shared::{
    auth::middleware::AuthContext,
    filters::RecipeFilter,
    models::{
        ingredient::Ingredient,
        recipe::{validate_price, CreateRecipe, Recipe, RecipeWithLabels, UpdateRecipe},
        tag::Tag,
    },
    reconcile::{reconcile, NameRef},
    storage::{recipe_image_path, validate_image, ImageStore},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

/// Query parameters for the recipe list
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListParams {
    /// Comma-separated tag ids
    pub tags: Option<String>,

    /// Comma-separated ingredient ids
    pub ingredients: Option<String>,
}

/// Create/update payload
///
/// Tags and ingredients are given by name. Omitting them leaves the
/// associations alone; an empty list clears them. Unknown fields such as
/// `user` are ignored.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct RecipePayload {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters."))]
    pub title: Option<String>,

    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0."))]
    pub time_minutes: Option<i32>,

    pub price: Option<Decimal>,

    pub description: Option<String>,

    #[validate(length(max = 255, message = "Ensure this field has no more than 255 characters."))]
    pub link: Option<String>,

    pub tags: Option<Vec<NameRef>>,

    pub ingredients: Option<Vec<NameRef>>,
}

fn field_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

impl RecipePayload {
    /// Runs field validation plus the checks derive can't express
    ///
    /// With `require_core`, `title`, `time_minutes` and `price` must be
    /// present (create and PUT).
    pub fn check(&self, require_core: bool) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_else(ValidationErrors::new);

        if require_core {
            if self.title.is_none() {
                errors.add("title", field_error("required", "This field is required."));
            }
            if self.time_minutes.is_none() {
                errors.add("time_minutes", field_error("required", "This field is required."));
            }
            if self.price.is_none() {
                errors.add("price", field_error("required", "This field is required."));
            }
        }

        if let Some(price) = &self.price {
            if let Err(message) = validate_price(price) {
                errors.add("price", field_error("price", message));
            }
        }

        for (field, names) in [("tags", &self.tags), ("ingredients", &self.ingredients)] {
            let invalid = names
                .iter()
                .flatten()
                .any(|n| n.name.is_empty() || n.name.chars().count() > 255);
            if invalid {
                errors.add(field, field_error("name", "Each name must have 1 to 255 characters."));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn into_create(self) -> ApiResult<(CreateRecipe, Labels)> {
        let (Some(title), Some(time_minutes), Some(price)) = (self.title, self.time_minutes, self.price)
        else {
            return Err(ApiError::BadRequest("title, time_minutes and price are required".to_string()));
        };

        Ok((
            CreateRecipe {
                title,
                time_minutes,
                price,
                description: self.description.unwrap_or_default(),
                link: self.link.unwrap_or_default(),
            },
            Labels {
                tags: self.tags,
                ingredients: self.ingredients,
            },
        ))
    }

    fn into_update(self) -> (UpdateRecipe, Labels) {
        (
            UpdateRecipe {
                title: self.title,
                time_minutes: self.time_minutes,
                price: self.price,
                description: self.description,
                link: self.link,
            },
            Labels {
                tags: self.tags,
                ingredients: self.ingredients,
            },
        )
    }
}

struct Labels {
    tags: Option<Vec<NameRef>>,
    ingredients: Option<Vec<NameRef>>,
}

/// Recipe as shown in lists
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<LabelResponse>,
    pub ingredients: Vec<LabelResponse>,
}

/// Recipe detail: the summary plus description and image URL
#[derive(Debug, Serialize, Deserialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: String,
    pub image: Option<String>,
}

impl From<&RecipeWithLabels> for RecipeSummary {
    fn from(item: &RecipeWithLabels) -> Self {
        Self {
            id: item.recipe.id,
            title: item.recipe.title.clone(),
            time_minutes: item.recipe.time_minutes,
            price: item.recipe.price,
            link: item.recipe.link.clone(),
            tags: item.tags.iter().map(LabelResponse::from_label::<Tag>).collect(),
            ingredients: item
                .ingredients
                .iter()
                .map(LabelResponse::from_label::<Ingredient>)
                .collect(),
        }
    }
}

fn detail(state: &AppState, item: &RecipeWithLabels) -> RecipeDetail {
    RecipeDetail {
        summary: item.into(),
        description: item.recipe.description.clone(),
        image: item.recipe.image.as_deref().map(|path| state.images.url(path)),
    }
}

/// Upload response
#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub id: i64,
    pub image: Option<String>,
}

/// Removes an image file the database no longer points at
///
/// Failures are logged, not returned. Returns whether the file is gone.
async fn discard_image(images: &dyn ImageStore, recipe_id: i64, path: &str) -> bool {
    match images.delete(path).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(recipe_id, path, error = %e, "Failed to remove recipe image");
            false
        }
    }
}

fn not_found() -> ApiError {
    ApiError::NotFound("Recipe not found".to_string())
}

async fn load_detail(state: &AppState, recipe: Recipe) -> ApiResult<RecipeDetail> {
    let items = Recipe::with_labels(&state.db, vec![recipe]).await?;
    let item = items.first().ok_or_else(not_found)?;
    Ok(detail(state, item))
}

/// List the caller's recipes
///
/// # Query Parameters
///
/// - `tags`: comma-separated tag ids; keep recipes with any of them
/// - `ingredients`: comma-separated ingredient ids; same, combined with
///   `tags` by AND
///
/// Results are ordered by id, newest first.
pub async fn list_recipes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<RecipeListParams>,
) -> ApiResult<axum::Json<Vec<RecipeSummary>>> {
    let filter = RecipeFilter::parse(params.tags.as_deref(), params.ingredients.as_deref())?;

    let recipes = Recipe::list_for_user(&state.db, auth.user_id, &filter).await?;
    let items = Recipe::with_labels(&state.db, recipes).await?;

    Ok(axum::Json(items.iter().map(RecipeSummary::from).collect()))
}

/// Create a recipe owned by the caller
///
/// # Endpoint
///
/// ```text
/// POST /v1/recipes/
/// Content-Type: application/json
///
/// {
///   "title": "Thai Prawn Curry",
///   "time_minutes": 30,
///   "price": "2.50",
///   "tags": [{"name": "Thai"}, {"name": "Dinner"}]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing or invalid fields
pub async fn create_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<RecipePayload>,
) -> ApiResult<(StatusCode, axum::Json<RecipeDetail>)> {
    payload.check(true)?;
    let (data, labels) = payload.into_create()?;

    let mut tx = state.db.begin().await?;
    let recipe = Recipe::create(&mut *tx, auth.user_id, data).await?;
    apply_labels(&mut tx, recipe.id, auth.user_id, labels).await?;
    tx.commit().await?;

    tracing::info!(recipe_id = recipe.id, user_id = auth.user_id, "Recipe created");

    let body = load_detail(&state, recipe).await?;
    Ok((StatusCode::CREATED, axum::Json(body)))
}

/// Recipe detail
pub async fn get_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<axum::Json<RecipeDetail>> {
    let recipe = Recipe::find_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    Ok(axum::Json(load_detail(&state, recipe).await?))
}

/// Replace a recipe; `title`, `time_minutes` and `price` are required
pub async fn replace_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<RecipePayload>,
) -> ApiResult<axum::Json<RecipeDetail>> {
    payload.check(true)?;
    write_recipe(&state, &auth, id, payload).await
}

/// Partially update a recipe
pub async fn update_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    Json(payload): Json<RecipePayload>,
) -> ApiResult<axum::Json<RecipeDetail>> {
    payload.check(false)?;
    write_recipe(&state, &auth, id, payload).await
}

async fn write_recipe(
    state: &AppState,
    auth: &AuthContext,
    id: i64,
    payload: RecipePayload,
) -> ApiResult<axum::Json<RecipeDetail>> {
    let (data, labels) = payload.into_update();

    let mut tx = state.db.begin().await?;
    let recipe = Recipe::update(&mut *tx, id, auth.user_id, data)
        .await?
        .ok_or_else(not_found)?;
    apply_labels(&mut tx, recipe.id, auth.user_id, labels).await?;
    tx.commit().await?;

    tracing::info!(recipe_id = recipe.id, user_id = auth.user_id, "Recipe updated");

    Ok(axum::Json(load_detail(state, recipe).await?))
}

async fn apply_labels(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    recipe_id: i64,
    user_id: i64,
    labels: Labels,
) -> Result<(), sqlx::Error> {
    if let Some(tags) = labels.tags {
        reconcile::<Tag>(&mut **tx, recipe_id, user_id, &tags).await?;
    }
    if let Some(ingredients) = labels.ingredients {
        reconcile::<Ingredient>(&mut **tx, recipe_id, user_id, &ingredients).await?;
    }
    Ok(())
}

/// Delete a recipe
///
/// Tags and ingredients it used are kept. The stored image, if any, is
/// removed after the row is gone.
pub async fn delete_recipe(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    let recipe = Recipe::delete_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    if let Some(image) = &recipe.image {
        discard_image(state.images.as_ref(), id, image).await;
    }

    tracing::info!(recipe_id = id, user_id = auth.user_id, "Recipe deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Upload an image for a recipe
///
/// # Endpoint
///
/// ```text
/// POST /v1/recipes/:id/upload-image/
/// Content-Type: multipart/form-data
///
/// image=<file>
/// ```
///
/// The file is decoded before it is stored; anything that is not a valid
/// image is rejected with 400 and the recipe keeps its current image.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<axum::Json<ImageResponse>> {
    let existing = Recipe::find_for_user(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(not_found)?;

    let mut multipart = multipart.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::invalid_field("image", "No file was submitted."))?;

    let format = validate_image(&bytes)?;
    let path = recipe_image_path(filename.as_deref(), format);
    state.images.save(&path, &bytes).await?;

    let Some(recipe) = Recipe::set_image(&state.db, id, auth.user_id, &path).await? else {
        // Deleted while uploading
        discard_image(state.images.as_ref(), id, &path).await;
        return Err(not_found());
    };

    if let Some(old) = existing.image.as_deref().filter(|old| *old != path) {
        discard_image(state.images.as_ref(), id, old).await;
    }

    tracing::info!(recipe_id = id, path = %path, "Recipe image uploaded");

    Ok(axum::Json(ImageResponse {
        id: recipe.id,
        image: recipe.image.as_deref().map(|p| state.images.url(p)),
    }))
}
