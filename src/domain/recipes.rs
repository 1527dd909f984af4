//! Recipe-sharing domain records.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DomainError;

/// A stored recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub id: Uuid,
    pub author_id: Uuid,
    pub name: String,
    pub text: String,
    pub cooking_time_minutes: u32,
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// One ingredient line of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecipeIngredient {
    pub name: String,
    pub measure: String,
}

/// A catalog ingredient (searchable, rarely changes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngredientRecord {
    pub id: Uuid,
    pub name: String,
    pub measurement_unit: String,
}

/// Input for creating or replacing a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time_minutes: u32,
    #[serde(default)]
    pub ingredients: Vec<RecipeIngredient>,
}

impl NewRecipe {
    /// Validate the input against the domain rules.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("recipe name must not be empty"));
        }
        if self.text.trim().is_empty() {
            return Err(DomainError::validation("recipe text must not be empty"));
        }
        if self.cooking_time_minutes < 1 {
            return Err(DomainError::validation(
                "cooking time must be at least one minute",
            ));
        }
        Ok(())
    }

    /// Materialize a record owned by `author_id`.
    pub fn into_record(self, author_id: Uuid) -> RecipeRecord {
        RecipeRecord {
            id: Uuid::new_v4(),
            author_id,
            name: self.name,
            text: self.text,
            cooking_time_minutes: self.cooking_time_minutes,
            ingredients: self.ingredients,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_input() -> NewRecipe {
        NewRecipe {
            name: "Pasta".to_string(),
            text: "Boil, drain, serve.".to_string(),
            cooking_time_minutes: 15,
            ingredients: vec![RecipeIngredient {
                name: "Spaghetti".to_string(),
                measure: "200 g".to_string(),
            }],
        }
    }

    #[test]
    fn accepts_valid_input() {
        assert!(valid_input().validate().is_ok());
    }

    #[test]
    fn rejects_blank_name() {
        let mut input = valid_input();
        input.name = "  ".to_string();
        assert!(input.validate().is_err());
    }

    #[test]
    fn rejects_zero_cooking_time() {
        let mut input = valid_input();
        input.cooking_time_minutes = 0;
        assert!(input.validate().is_err());
    }

    #[test]
    fn into_record_assigns_author() {
        let author = Uuid::new_v4();
        let record = valid_input().into_record(author);
        assert_eq!(record.author_id, author);
        assert!(!record.id.is_nil());
    }
}
