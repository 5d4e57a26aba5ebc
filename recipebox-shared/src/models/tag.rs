/// Tag model
///
/// Tags are created implicitly by recipe writes (see `reconcile`) and
/// otherwise only listed, renamed or deleted. Queries are in
/// [`super::label`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tags (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name VARCHAR(255) NOT NULL,
///     CONSTRAINT tags_user_id_name_key UNIQUE (user_id, name)
/// );
/// ```

use std::fmt;

use serde::{Deserialize, Serialize};

use super::label::{Label, LabelRow};

/// A user-owned recipe tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

impl Label for Tag {
    const TABLE: &'static str = "tags";
    const LINK_TABLE: &'static str = "recipe_tags";
    const LINK_COLUMN: &'static str = "tag_id";
    const KIND: &'static str = "Tag";

    fn from_row(row: LabelRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn user_id(&self) -> i64 {
        self.user_id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_display_is_name() {
        let tag = Tag {
            id: 1,
            user_id: 1,
            name: "Tag1".to_string(),
        };
        assert_eq!(tag.to_string(), "Tag1");
    }

    #[test]
    fn test_tag_from_row() {
        let tag = Tag::from_row(LabelRow {
            id: 5,
            user_id: 2,
            name: "Vegan".to_string(),
        });

        assert_eq!(tag.id(), 5);
        assert_eq!(tag.user_id, 2);
        assert_eq!(tag.name(), "Vegan");
    }
}
