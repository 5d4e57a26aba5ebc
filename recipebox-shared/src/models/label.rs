/// Owner-scoped named entities attached to recipes
///
/// Tags and ingredients have the same shape: an id, an owner and a name,
/// plus a link table to recipes. [`Label`] describes where each one lives,
/// and the functions here implement every query once for both.
///
/// Single-statement functions take any `PgExecutor`, so they run equally on
/// the pool or inside a transaction (`&mut *tx`).

use sqlx::{PgConnection, PgExecutor, PgPool};

/// Row shape shared by every label table
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LabelRow {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct LinkedLabelRow {
    recipe_id: i64,
    id: i64,
    user_id: i64,
    name: String,
}

/// A table of named, user-owned rows linked many-to-many to recipes
pub trait Label: Sized + Send + Unpin + 'static {
    /// Table holding the rows
    const TABLE: &'static str;

    /// Link table between recipes and this table
    const LINK_TABLE: &'static str;

    /// Column in `LINK_TABLE` referencing `TABLE`
    const LINK_COLUMN: &'static str;

    /// Singular human-readable name, for messages
    const KIND: &'static str;

    fn from_row(row: LabelRow) -> Self;

    fn id(&self) -> i64;

    fn user_id(&self) -> i64;

    fn name(&self) -> &str;
}

/// The owner's labels, ordered by name descending
///
/// With `assigned_only`, labels not linked to any recipe are left out. The
/// check is an `EXISTS`, so a label linked to many recipes still appears
/// once.
pub async fn list_for_user<T: Label>(
    pool: &PgPool,
    user_id: i64,
    assigned_only: bool,
) -> Result<Vec<T>, sqlx::Error> {
    let assigned = if assigned_only {
        format!(
            " AND EXISTS (SELECT 1 FROM {link} l WHERE l.{col} = t.id)",
            link = T::LINK_TABLE,
            col = T::LINK_COLUMN,
        )
    } else {
        String::new()
    };

    let query = format!(
        "SELECT t.id, t.user_id, t.name FROM {table} t
         WHERE t.user_id = $1{assigned}
         ORDER BY t.name DESC, t.id DESC",
        table = T::TABLE,
    );

    let rows = sqlx::query_as::<_, LabelRow>(&query)
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(T::from_row).collect())
}

/// Every label of this kind across all users, oldest first
pub async fn list_all<T: Label>(pool: &PgPool) -> Result<Vec<T>, sqlx::Error> {
    let query = format!("SELECT id, user_id, name FROM {} ORDER BY id", T::TABLE);

    let rows = sqlx::query_as::<_, LabelRow>(&query).fetch_all(pool).await?;
    Ok(rows.into_iter().map(T::from_row).collect())
}

/// Looks a label up by id, only if `user_id` owns it
pub async fn find_for_user<'e, T: Label, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    user_id: i64,
) -> Result<Option<T>, sqlx::Error> {
    let query = format!(
        "SELECT id, user_id, name FROM {} WHERE id = $1 AND user_id = $2",
        T::TABLE
    );

    let row = sqlx::query_as::<_, LabelRow>(&query)
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(T::from_row))
}

/// Inserts a label, failing if the owner already has one with this name
pub async fn create<'e, T: Label, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    name: &str,
) -> Result<T, sqlx::Error> {
    let query = format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, user_id, name",
        T::TABLE
    );

    let row = sqlx::query_as::<_, LabelRow>(&query)
        .bind(user_id)
        .bind(name)
        .fetch_one(executor)
        .await?;

    Ok(T::from_row(row))
}

/// Returns the owner's label with this name, creating it if needed
///
/// The no-op `DO UPDATE` makes `RETURNING` yield the existing row on a
/// conflict, so two concurrent calls for the same name get the same id.
pub async fn get_or_create<'e, T: Label, E: PgExecutor<'e>>(
    executor: E,
    user_id: i64,
    name: &str,
) -> Result<T, sqlx::Error> {
    let query = format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2)
         ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
         RETURNING id, user_id, name",
        T::TABLE
    );

    let row = sqlx::query_as::<_, LabelRow>(&query)
        .bind(user_id)
        .bind(name)
        .fetch_one(executor)
        .await?;

    Ok(T::from_row(row))
}

/// Renames an owned label
///
/// Returns `None` if the label does not exist or belongs to someone else.
pub async fn rename<'e, T: Label, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    user_id: i64,
    name: &str,
) -> Result<Option<T>, sqlx::Error> {
    let query = format!(
        "UPDATE {} SET name = $3 WHERE id = $1 AND user_id = $2 RETURNING id, user_id, name",
        T::TABLE
    );

    let row = sqlx::query_as::<_, LabelRow>(&query)
        .bind(id)
        .bind(user_id)
        .bind(name)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(T::from_row))
}

/// Deletes an owned label; its recipe links go with it
pub async fn delete_for_user<'e, T: Label, E: PgExecutor<'e>>(
    executor: E,
    id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let query = format!("DELETE FROM {} WHERE id = $1 AND user_id = $2", T::TABLE);

    let result = sqlx::query(&query)
        .bind(id)
        .bind(user_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Labels linked to one recipe, by id
pub async fn for_recipe<'e, T: Label, E: PgExecutor<'e>>(
    executor: E,
    recipe_id: i64,
) -> Result<Vec<T>, sqlx::Error> {
    let query = format!(
        "SELECT t.id, t.user_id, t.name FROM {table} t
         JOIN {link} l ON l.{col} = t.id
         WHERE l.recipe_id = $1
         ORDER BY t.id",
        table = T::TABLE,
        link = T::LINK_TABLE,
        col = T::LINK_COLUMN,
    );

    let rows = sqlx::query_as::<_, LabelRow>(&query)
        .bind(recipe_id)
        .fetch_all(executor)
        .await?;

    Ok(rows.into_iter().map(T::from_row).collect())
}

/// Labels linked to any of `recipe_ids`, as `(recipe_id, label)` pairs
///
/// Used by list endpoints to load all associations in one query.
pub async fn for_recipes<'e, T: Label, E: PgExecutor<'e>>(
    executor: E,
    recipe_ids: &[i64],
) -> Result<Vec<(i64, T)>, sqlx::Error> {
    if recipe_ids.is_empty() {
        return Ok(Vec::new());
    }

    let query = format!(
        "SELECT l.recipe_id, t.id, t.user_id, t.name FROM {table} t
         JOIN {link} l ON l.{col} = t.id
         WHERE l.recipe_id = ANY($1)
         ORDER BY t.id",
        table = T::TABLE,
        link = T::LINK_TABLE,
        col = T::LINK_COLUMN,
    );

    let rows = sqlx::query_as::<_, LinkedLabelRow>(&query)
        .bind(recipe_ids)
        .fetch_all(executor)
        .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let label = T::from_row(LabelRow {
                id: row.id,
                user_id: row.user_id,
                name: row.name,
            });
            (row.recipe_id, label)
        })
        .collect())
}

/// Replaces a recipe's links with exactly `ids`
pub async fn set_for_recipe<T: Label>(
    conn: &mut PgConnection,
    recipe_id: i64,
    ids: &[i64],
) -> Result<(), sqlx::Error> {
    let delete = format!("DELETE FROM {} WHERE recipe_id = $1", T::LINK_TABLE);
    sqlx::query(&delete).bind(recipe_id).execute(&mut *conn).await?;

    if ids.is_empty() {
        return Ok(());
    }

    let insert = format!(
        "INSERT INTO {link} (recipe_id, {col})
         SELECT $1, UNNEST($2::BIGINT[])
         ON CONFLICT DO NOTHING",
        link = T::LINK_TABLE,
        col = T::LINK_COLUMN,
    );
    sqlx::query(&insert)
        .bind(recipe_id)
        .bind(ids)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Links one more label to a recipe, keeping the existing links
pub async fn attach<'e, T: Label, E: PgExecutor<'e>>(
    executor: E,
    recipe_id: i64,
    id: i64,
) -> Result<(), sqlx::Error> {
    let query = format!(
        "INSERT INTO {link} (recipe_id, {col}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        link = T::LINK_TABLE,
        col = T::LINK_COLUMN,
    );

    sqlx::query(&query)
        .bind(recipe_id)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(())
}
