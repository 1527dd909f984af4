//! Recipe persistence seam.
//!
//! [`RecipesRepo`] is the storage boundary the service layer depends on.
//! [`MemoryRecipesRepo`] is the in-process implementation; a database-backed
//! one would slot in behind the same trait.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::cache::lock::{rw_read, rw_write};
use crate::domain::error::DomainError;
use crate::domain::recipes::{IngredientRecord, RecipeRecord};

const SOURCE: &str = "infra::repo";

pub const DEFAULT_PAGE_LIMIT: usize = 10;
pub const MAX_PAGE_LIMIT: usize = 100;

/// Filter applied to recipe listings.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<Uuid>,
    /// Case-insensitive substring match on the recipe name.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: usize,
    pub limit: usize,
}

impl RecipeFilter {
    pub fn page_non_zero(&self) -> usize {
        self.page.max(1)
    }

    pub fn limit_clamped(&self) -> usize {
        match self.limit {
            0 => DEFAULT_PAGE_LIMIT,
            n => n.min(MAX_PAGE_LIMIT),
        }
    }
}

/// One page of recipes plus the unpaged total.
#[derive(Debug, Clone)]
pub struct RecipePage {
    pub total: usize,
    pub recipes: Vec<RecipeRecord>,
}

#[async_trait]
pub trait RecipesRepo: Send + Sync {
    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<RecipePage, DomainError>;
    async fn find_recipe(&self, id: Uuid) -> Result<RecipeRecord, DomainError>;
    async fn insert_recipe(&self, recipe: RecipeRecord) -> Result<(), DomainError>;
    async fn update_recipe(&self, recipe: RecipeRecord) -> Result<(), DomainError>;
    async fn delete_recipe(&self, id: Uuid) -> Result<(), DomainError>;

    async fn list_ingredients(&self) -> Result<Vec<IngredientRecord>, DomainError>;
    async fn find_ingredient(&self, id: Uuid) -> Result<IngredientRecord, DomainError>;

    /// Returns `false` when the recipe was already a favorite.
    async fn add_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, DomainError>;
    /// Returns `false` when the recipe was not a favorite.
    async fn remove_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, DomainError>;
    async fn is_favorited(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, DomainError>;

    async fn add_cart_item(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, DomainError>;
    async fn remove_cart_item(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, DomainError>;
    /// Every recipe currently in the user's shopping cart.
    async fn list_cart_recipes(&self, user_id: Uuid) -> Result<Vec<RecipeRecord>, DomainError>;
}

/// In-memory repository used by the default deployment and tests.
#[derive(Default)]
pub struct MemoryRecipesRepo {
    recipes: RwLock<HashMap<Uuid, RecipeRecord>>,
    ingredients: RwLock<Vec<IngredientRecord>>,
    favorites: RwLock<HashSet<(Uuid, Uuid)>>,
    cart: RwLock<HashSet<(Uuid, Uuid)>>,
}

impl MemoryRecipesRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ingredient catalog at startup.
    pub fn with_ingredients(self, ingredients: Vec<IngredientRecord>) -> Self {
        *rw_write(&self.ingredients, SOURCE, "with_ingredients") = ingredients;
        self
    }

    fn matches(recipe: &RecipeRecord, filter: &RecipeFilter) -> bool {
        if let Some(author) = filter.author
            && recipe.author_id != author
        {
            return false;
        }
        if let Some(search) = &filter.search
            && !recipe.name.to_lowercase().contains(&search.to_lowercase())
        {
            return false;
        }
        true
    }
}

#[async_trait]
impl RecipesRepo for MemoryRecipesRepo {
    async fn list_recipes(&self, filter: &RecipeFilter) -> Result<RecipePage, DomainError> {
        let recipes = rw_read(&self.recipes, SOURCE, "list_recipes");
        let mut matching: Vec<RecipeRecord> = recipes
            .values()
            .filter(|recipe| Self::matches(recipe, filter))
            .cloned()
            .collect();
        // Newest first, id as tiebreaker for a stable order.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let total = matching.len();
        let limit = filter.limit_clamped();
        let offset = (filter.page_non_zero() - 1).saturating_mul(limit);
        let page = matching.into_iter().skip(offset).take(limit).collect();
        Ok(RecipePage {
            total,
            recipes: page,
        })
    }

    async fn find_recipe(&self, id: Uuid) -> Result<RecipeRecord, DomainError> {
        rw_read(&self.recipes, SOURCE, "find_recipe")
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("recipe"))
    }

    async fn insert_recipe(&self, recipe: RecipeRecord) -> Result<(), DomainError> {
        rw_write(&self.recipes, SOURCE, "insert_recipe").insert(recipe.id, recipe);
        Ok(())
    }

    async fn update_recipe(&self, recipe: RecipeRecord) -> Result<(), DomainError> {
        let mut recipes = rw_write(&self.recipes, SOURCE, "update_recipe");
        if !recipes.contains_key(&recipe.id) {
            return Err(DomainError::not_found("recipe"));
        }
        recipes.insert(recipe.id, recipe);
        Ok(())
    }

    async fn delete_recipe(&self, id: Uuid) -> Result<(), DomainError> {
        if rw_write(&self.recipes, SOURCE, "delete_recipe")
            .remove(&id)
            .is_none()
        {
            return Err(DomainError::not_found("recipe"));
        }
        // Dangling favorites and cart rows go with the recipe.
        rw_write(&self.favorites, SOURCE, "delete_recipe").retain(|(_, rid)| *rid != id);
        rw_write(&self.cart, SOURCE, "delete_recipe").retain(|(_, rid)| *rid != id);
        Ok(())
    }

    async fn list_ingredients(&self) -> Result<Vec<IngredientRecord>, DomainError> {
        Ok(rw_read(&self.ingredients, SOURCE, "list_ingredients").clone())
    }

    async fn find_ingredient(&self, id: Uuid) -> Result<IngredientRecord, DomainError> {
        rw_read(&self.ingredients, SOURCE, "find_ingredient")
            .iter()
            .find(|ingredient| ingredient.id == id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("ingredient"))
    }

    async fn add_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, DomainError> {
        if !rw_read(&self.recipes, SOURCE, "add_favorite").contains_key(&recipe_id) {
            return Err(DomainError::not_found("recipe"));
        }
        Ok(rw_write(&self.favorites, SOURCE, "add_favorite").insert((user_id, recipe_id)))
    }

    async fn remove_favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, DomainError> {
        Ok(rw_write(&self.favorites, SOURCE, "remove_favorite").remove(&(user_id, recipe_id)))
    }

    async fn is_favorited(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, DomainError> {
        Ok(rw_read(&self.favorites, SOURCE, "is_favorited").contains(&(user_id, recipe_id)))
    }

    async fn add_cart_item(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, DomainError> {
        if !rw_read(&self.recipes, SOURCE, "add_cart_item").contains_key(&recipe_id) {
            return Err(DomainError::not_found("recipe"));
        }
        Ok(rw_write(&self.cart, SOURCE, "add_cart_item").insert((user_id, recipe_id)))
    }

    async fn remove_cart_item(&self, user_id: Uuid, recipe_id: Uuid) -> Result<bool, DomainError> {
        Ok(rw_write(&self.cart, SOURCE, "remove_cart_item").remove(&(user_id, recipe_id)))
    }

    async fn list_cart_recipes(&self, user_id: Uuid) -> Result<Vec<RecipeRecord>, DomainError> {
        let cart = rw_read(&self.cart, SOURCE, "list_cart_recipes");
        let recipes = rw_read(&self.recipes, SOURCE, "list_cart_recipes");
        let mut in_cart: Vec<RecipeRecord> = cart
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, rid)| recipes.get(rid).cloned())
            .collect();
        in_cart.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(in_cart)
    }
}
