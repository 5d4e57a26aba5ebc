/// Tag and ingredient reconciliation for recipe writes
///
/// Recipe payloads name their tags and ingredients instead of referencing
/// ids. For each name the owner's existing row is reused, or a new one is
/// created, and the recipe's links are replaced with the result. Call this
/// inside the same transaction as the recipe write.
///
/// # Example
///
/// ```no_run
/// use recipebox_shared::models::tag::Tag;
/// use recipebox_shared::reconcile::{reconcile, NameRef};
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), sqlx::Error> {
/// let mut tx = pool.begin().await?;
/// let names = vec![NameRef::new("Thai"), NameRef::new("Dinner")];
/// let tags: Vec<Tag> = reconcile(&mut *tx, 1, 1, &names).await?;
/// tx.commit().await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::PgConnection;
use std::collections::HashMap;

use crate::models::label::{self, Label};

/// A tag or ingredient referenced by name in a recipe payload
///
/// Surrounding whitespace is stripped on the way in, so `" Thai "` and
/// `"Thai"` name the same row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    #[serde(deserialize_with = "deserialize_trimmed")]
    pub name: String,
}

impl NameRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
        }
    }
}

/// Serde helper for name fields: strips surrounding whitespace
pub fn deserialize_trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

/// Names in first-seen order, without repeats
pub fn unique_names(refs: &[NameRef]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::with_capacity(refs.len());
    for name_ref in refs {
        if !names.contains(&name_ref.name.as_str()) {
            names.push(&name_ref.name);
        }
    }
    names
}

/// Makes `names` the complete set of `T` linked to the recipe
///
/// Each name resolves to the owner's existing row or a newly created one;
/// rows of other users are never matched. An empty list clears the links.
/// Returns the linked rows in request order.
///
/// Rows are upserted in sorted name order so that concurrent writes by the
/// same user take the unique-index locks in the same order.
pub async fn reconcile<T: Label>(
    conn: &mut PgConnection,
    recipe_id: i64,
    user_id: i64,
    names: &[NameRef],
) -> Result<Vec<T>, sqlx::Error> {
    let requested = unique_names(names);

    let mut lock_order = requested.clone();
    lock_order.sort_unstable();

    let mut resolved: HashMap<&str, T> = HashMap::with_capacity(lock_order.len());
    for name in lock_order {
        let row: T = label::get_or_create(&mut *conn, user_id, name).await?;
        resolved.insert(name, row);
    }

    let labels: Vec<T> = requested
        .into_iter()
        .filter_map(|name| resolved.remove(name))
        .collect();

    let ids: Vec<i64> = labels.iter().map(|l| l.id()).collect();
    label::set_for_recipe::<T>(conn, recipe_id, &ids).await?;

    tracing::debug!(
        recipe_id,
        kind = T::KIND,
        count = ids.len(),
        "Reconciled recipe labels"
    );

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names_keeps_first_seen_order() {
        let refs = vec![
            NameRef::new("Thai"),
            NameRef::new("Dinner"),
            NameRef::new("Thai"),
        ];
        assert_eq!(unique_names(&refs), vec!["Thai", "Dinner"]);
    }

    #[test]
    fn test_unique_names_is_case_sensitive() {
        let refs = vec![NameRef::new("Salt"), NameRef::new("salt")];
        assert_eq!(unique_names(&refs), vec!["Salt", "salt"]);
    }

    #[test]
    fn test_names_are_trimmed() {
        let refs: Vec<NameRef> =
            serde_json::from_str(r#"[{"name": "Thai"}, {"name": " Thai "}, {"name": "   "}]"#)
                .unwrap();
        assert_eq!(unique_names(&refs), vec!["Thai", ""]);
        assert_eq!(NameRef::new("  Dinner\t"), NameRef::new("Dinner"));
    }

    #[test]
    fn test_unique_names_empty() {
        assert!(unique_names(&[]).is_empty());
    }

    #[test]
    fn test_name_ref_deserializes_from_object() {
        let refs: Vec<NameRef> =
            serde_json::from_str(r#"[{"name": "Lemon"}, {"name": "Salt"}]"#).unwrap();
        assert_eq!(refs, vec![NameRef::new("Lemon"), NameRef::new("Salt")]);
    }
}
