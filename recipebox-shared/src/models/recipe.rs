/// Recipe model and database operations
///
/// Every lookup takes the caller's `user_id` and filters on it. A recipe
/// owned by someone else is indistinguishable from a missing one.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE recipes (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     time_minutes INTEGER NOT NULL CHECK (time_minutes >= 0),
///     price NUMERIC(5, 2) NOT NULL CHECK (price >= 0),
///     description TEXT NOT NULL DEFAULT '',
///     link VARCHAR(255) NOT NULL DEFAULT '',
///     image VARCHAR(255),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Postgres, QueryBuilder};

use super::{ingredient::Ingredient, label::Label, tag::Tag};
use crate::filters::RecipeFilter;

const RECIPE_COLUMNS: &str =
    "id, user_id, title, time_minutes, price, description, link, image, created_at, updated_at";

/// Digits allowed in a price, including the decimal places
pub const PRICE_MAX_DIGITS: u32 = 5;

/// Decimal places allowed in a price
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// A recipe owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Recipe {
    pub id: i64,

    /// Owner; never changes after creation
    pub user_id: i64,

    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,

    /// Free text, may be empty
    pub description: String,

    /// External link, may be empty
    pub link: String,

    /// Storage path of the uploaded image, relative to the media root
    pub image: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Input for creating a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecipe {
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub description: String,
    pub link: String,
}

/// Fields to change on a recipe; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRecipe {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub link: Option<String>,
}

impl UpdateRecipe {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.time_minutes.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.link.is_none()
    }
}

/// Checks a price against the `NUMERIC(5, 2)` column
///
/// Returns the message to show the client on failure.
pub fn validate_price(price: &Decimal) -> Result<(), &'static str> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err("Ensure this value is greater than or equal to 0.");
    }

    let normalized = price.normalize();
    if normalized.scale() > PRICE_DECIMAL_PLACES {
        return Err("Ensure that there are no more than 2 decimal places.");
    }

    let max_whole = Decimal::from(10_i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if normalized.trunc() >= max_whole {
        return Err("Ensure that there are no more than 5 digits in total.");
    }

    Ok(())
}

/// A recipe together with its tags and ingredients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeWithLabels {
    pub recipe: Recipe,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    /// Inserts a recipe owned by `user_id`
    pub async fn create<'e, E: PgExecutor<'e>>(
        executor: E,
        user_id: i64,
        data: CreateRecipe,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO recipes (user_id, title, time_minutes, price, description, link)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {RECIPE_COLUMNS}"
        );

        sqlx::query_as::<_, Recipe>(&query)
            .bind(user_id)
            .bind(data.title)
            .bind(data.time_minutes)
            .bind(data.price)
            .bind(data.description)
            .bind(data.link)
            .fetch_one(executor)
            .await
    }

    /// Looks a recipe up by id, only if `user_id` owns it
    pub async fn find_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2");

        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// The owner's recipes matching `filter`, newest id first
    ///
    /// Each supplied id set must match at least one association; the two
    /// sets are combined with AND. `EXISTS` keeps each recipe to one row.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: i64,
        filter: &RecipeFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("SELECT ");
        builder
            .push(RECIPE_COLUMNS)
            .push(" FROM recipes r WHERE r.user_id = ")
            .push_bind(user_id);

        if let Some(tag_ids) = &filter.tag_ids {
            push_link_filter::<Tag>(&mut builder, tag_ids);
        }
        if let Some(ingredient_ids) = &filter.ingredient_ids {
            push_link_filter::<Ingredient>(&mut builder, ingredient_ids);
        }

        builder.push(" ORDER BY r.id DESC");

        builder.build_query_as::<Recipe>().fetch_all(pool).await
    }

    /// Every recipe across all users, oldest first
    pub async fn list_all(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!("SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY id");

        sqlx::query_as::<_, Recipe>(&query).fetch_all(pool).await
    }

    /// Applies the non-`None` fields of `data` to an owned recipe
    ///
    /// Ownership is part of the `WHERE` clause and `user_id` is never in
    /// the `SET` list.
    pub async fn update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i64,
        user_id: i64,
        data: UpdateRecipe,
    ) -> Result<Option<Self>, sqlx::Error> {
        if data.is_empty() {
            return Self::find_for_user(executor, id, user_id).await;
        }

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE recipes SET updated_at = NOW()");

        if let Some(title) = data.title {
            builder.push(", title = ").push_bind(title);
        }
        if let Some(time_minutes) = data.time_minutes {
            builder.push(", time_minutes = ").push_bind(time_minutes);
        }
        if let Some(price) = data.price {
            builder.push(", price = ").push_bind(price);
        }
        if let Some(description) = data.description {
            builder.push(", description = ").push_bind(description);
        }
        if let Some(link) = data.link {
            builder.push(", link = ").push_bind(link);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND user_id = ")
            .push_bind(user_id)
            .push(" RETURNING ")
            .push(RECIPE_COLUMNS);

        builder
            .build_query_as::<Recipe>()
            .fetch_optional(executor)
            .await
    }

    /// Points an owned recipe at a new image path
    pub async fn set_image<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i64,
        user_id: i64,
        image: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE recipes SET image = $3, updated_at = NOW()
             WHERE id = $1 AND user_id = $2
             RETURNING {RECIPE_COLUMNS}"
        );

        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .bind(user_id)
            .bind(image)
            .fetch_optional(executor)
            .await
    }

    /// Deletes an owned recipe and returns the deleted row
    ///
    /// Link rows are removed by cascade; tags and ingredients stay.
    pub async fn delete_for_user<'e, E: PgExecutor<'e>>(
        executor: E,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "DELETE FROM recipes WHERE id = $1 AND user_id = $2 RETURNING {RECIPE_COLUMNS}"
        );

        sqlx::query_as::<_, Recipe>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(executor)
            .await
    }

    /// Loads tags and ingredients for a batch of recipes, keeping order
    pub async fn with_labels(
        pool: &PgPool,
        recipes: Vec<Recipe>,
    ) -> Result<Vec<RecipeWithLabels>, sqlx::Error> {
        let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();

        let tags = super::label::for_recipes::<Tag, _>(pool, &ids).await?;
        let ingredients = super::label::for_recipes::<Ingredient, _>(pool, &ids).await?;

        Ok(recipes
            .into_iter()
            .map(|recipe| RecipeWithLabels {
                tags: labels_of(&tags, recipe.id),
                ingredients: labels_of(&ingredients, recipe.id),
                recipe,
            })
            .collect())
    }
}

fn labels_of<T: Label + Clone>(pairs: &[(i64, T)], recipe_id: i64) -> Vec<T> {
    pairs
        .iter()
        .filter(|(id, _)| *id == recipe_id)
        .map(|(_, label)| label.clone())
        .collect()
}

fn push_link_filter<T: Label>(builder: &mut QueryBuilder<'_, Postgres>, ids: &[i64]) {
    builder
        .push(" AND EXISTS (SELECT 1 FROM ")
        .push(T::LINK_TABLE)
        .push(" l WHERE l.recipe_id = r.id AND l.")
        .push(T::LINK_COLUMN)
        .push(" = ANY(")
        .push_bind(ids.to_vec())
        .push("))");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn recipe(title: &str) -> Recipe {
        Recipe {
            id: 1,
            user_id: 1,
            title: title.to_string(),
            time_minutes: 5,
            price: Decimal::from_str("5.50").unwrap(),
            description: "Sample recipe description.".to_string(),
            link: String::new(),
            image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_recipe_display_is_title() {
        let recipe = recipe("Sample recipe name");
        assert_eq!(recipe.to_string(), recipe.title);
    }

    #[test]
    fn test_validate_price_accepts_valid_values() {
        for value in ["0", "5.5", "5.50", "999.99", "12.3000"] {
            let price = Decimal::from_str(value).unwrap();
            assert!(validate_price(&price).is_ok(), "{} should be valid", value);
        }
    }

    #[test]
    fn test_validate_price_rejects_invalid_values() {
        let cases = [
            ("-1.00", "greater than or equal to 0"),
            ("1.999", "decimal places"),
            ("1000", "5 digits"),
            ("1000.00", "5 digits"),
        ];

        for (value, message) in cases {
            let price = Decimal::from_str(value).unwrap();
            let err = validate_price(&price).unwrap_err();
            assert!(err.contains(message), "{} -> {}", value, err);
        }
    }

    #[test]
    fn test_update_recipe_is_empty() {
        assert!(UpdateRecipe::default().is_empty());
        assert!(!UpdateRecipe {
            price: Some(Decimal::ONE),
            ..Default::default()
        }
        .is_empty());
    }

    #[test]
    fn test_labels_of_groups_by_recipe() {
        let pairs = vec![
            (1, Tag { id: 10, user_id: 1, name: "Vegan".to_string() }),
            (2, Tag { id: 11, user_id: 1, name: "Dessert".to_string() }),
            (1, Tag { id: 11, user_id: 1, name: "Dessert".to_string() }),
        ];

        let tags = labels_of(&pairs, 1);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "Vegan");
        assert!(labels_of(&pairs, 3).is_empty());
    }
}
