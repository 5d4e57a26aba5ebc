/// Ingredient model
///
/// Same shape and ownership rules as [`super::tag::Tag`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::label::{Label, LabelRow};

/// A user-owned recipe ingredient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

impl Label for Ingredient {
    const TABLE: &'static str = "ingredients";
    const LINK_TABLE: &'static str = "recipe_ingredients";
    const LINK_COLUMN: &'static str = "ingredient_id";
    const KIND: &'static str = "Ingredient";

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

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingredient_display_is_name() {
        let ingredient = Ingredient {
            id: 1,
            user_id: 1,
            name: "Cucumber".to_string(),
        };
        assert_eq!(ingredient.to_string(), "Cucumber");
    }
}
