//! Recipe service: cached reads, invalidating writes.
//!
//! Reads go through per-endpoint [`ReadThrough`] readers; every mutation
//! commits to the repository first and then clears the matching invalidation
//! family. Failed mutations never invalidate, so a rejected write cannot
//! evict still-valid entries.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Value, json};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::cache::{
    Cache, CacheConfig, CacheParams, CachedPayload, ReadThrough,
    invalidation::{FAVORITES, INGREDIENTS, RECIPES, SHOPPING_CART},
};
use crate::domain::recipes::{NewRecipe, RecipeRecord};
use crate::infra::repo::{RecipeFilter, RecipesRepo};

pub struct RecipeService {
    repo: Arc<dyn RecipesRepo>,
    cache: Cache,
    list_reader: ReadThrough,
    detail_reader: ReadThrough,
    ingredients_reader: ReadThrough,
    ingredient_detail_reader: ReadThrough,
}

impl RecipeService {
    pub fn new(repo: Arc<dyn RecipesRepo>, cache: Cache, config: &CacheConfig) -> Self {
        Self {
            repo,
            list_reader: ReadThrough::new("recipes:list", config.list_ttl, cache.clone()),
            detail_reader: ReadThrough::new("recipes:detail", config.detail_ttl, cache.clone()),
            ingredients_reader: ReadThrough::new(
                "ingredients:list",
                config.ingredient_ttl,
                cache.clone(),
            ),
            ingredient_detail_reader: ReadThrough::new(
                "ingredients:detail",
                config.ingredient_ttl,
                cache.clone(),
            ),
            cache,
        }
    }

    /// Paginated recipe listing, cached per caller identity.
    pub async fn list(
        &self,
        identity: Option<Uuid>,
        filter: RecipeFilter,
    ) -> Result<CachedPayload, AppError> {
        let identity_tag = identity.map(|id| id.to_string());
        let mut params = CacheParams::new();
        params.insert("page".to_string(), filter.page_non_zero().to_string());
        params.insert("limit".to_string(), filter.limit_clamped().to_string());
        if let Some(author) = filter.author {
            params.insert("author".to_string(), author.to_string());
        }
        if let Some(search) = &filter.search {
            params.insert("search".to_string(), search.to_lowercase());
        }

        self.list_reader
            .respond(identity_tag.as_deref(), &params, || async {
                let page = self.repo.list_recipes(&filter).await?;
                let mut results = Vec::with_capacity(page.recipes.len());
                for recipe in &page.recipes {
                    results.push(self.recipe_json(identity, recipe).await?);
                }
                Ok(CachedPayload::ok(json!({
                    "count": page.total,
                    "results": results,
                })))
            })
            .await
    }

    /// Single recipe, cached per caller identity. Missing recipes propagate
    /// as errors and are never cached.
    pub async fn detail(
        &self,
        identity: Option<Uuid>,
        recipe_id: Uuid,
    ) -> Result<CachedPayload, AppError> {
        let identity_tag = identity.map(|id| id.to_string());
        let mut params = CacheParams::new();
        params.insert("id".to_string(), recipe_id.to_string());

        self.detail_reader
            .respond(identity_tag.as_deref(), &params, || async {
                let recipe = self.repo.find_recipe(recipe_id).await?;
                Ok(CachedPayload::ok(
                    self.recipe_json(identity, &recipe).await?,
                ))
            })
            .await
    }

    /// Ingredient catalog, cached globally (identity never changes it).
    pub async fn list_ingredients(&self) -> Result<CachedPayload, AppError> {
        self.ingredients_reader
            .respond(None, &CacheParams::new(), || async {
                let ingredients = self.repo.list_ingredients().await?;
                Ok(CachedPayload::ok(json!({
                    "count": ingredients.len(),
                    "results": ingredients,
                })))
            })
            .await
    }

    /// Single catalog ingredient, cached globally like the catalog listing.
    pub async fn ingredient_detail(&self, ingredient_id: Uuid) -> Result<CachedPayload, AppError> {
        let mut params = CacheParams::new();
        params.insert("id".to_string(), ingredient_id.to_string());

        self.ingredient_detail_reader
            .respond(None, &params, || async {
                let ingredient = self.repo.find_ingredient(ingredient_id).await?;
                let body = serde_json::to_value(&ingredient).map_err(|err| {
                    AppError::unexpected(format!("ingredient serialization failed: {err}"))
                })?;
                Ok(CachedPayload::ok(body))
            })
            .await
    }

    /// Plain-text shopping list: every ingredient line across the user's
    /// carted recipes, with repeated lines aggregated.
    pub async fn download_shopping_cart(&self, user_id: Uuid) -> Result<String, AppError> {
        let recipes = self.repo.list_cart_recipes(user_id).await?;

        let mut totals: BTreeMap<(String, String), usize> = BTreeMap::new();
        for recipe in &recipes {
            for line in &recipe.ingredients {
                *totals
                    .entry((line.name.clone(), line.measure.clone()))
                    .or_insert(0) += 1;
            }
        }

        let mut lines = vec!["Shopping list:".to_string(), String::new()];
        for ((name, measure), count) in &totals {
            if *count > 1 {
                lines.push(format!("- {name}: {count} x {measure}"));
            } else {
                lines.push(format!("- {name}: {measure}"));
            }
        }
        Ok(lines.join("\n"))
    }

    pub async fn create(&self, author_id: Uuid, input: NewRecipe) -> Result<RecipeRecord, AppError> {
        input.validate()?;
        let recipe = input.into_record(author_id);
        self.repo.insert_recipe(recipe.clone()).await?;
        RECIPES.invalidate(&self.cache, None).await;
        Ok(recipe)
    }

    pub async fn update(
        &self,
        author_id: Uuid,
        recipe_id: Uuid,
        input: NewRecipe,
    ) -> Result<RecipeRecord, AppError> {
        let existing = self.repo.find_recipe(recipe_id).await?;
        if existing.author_id != author_id {
            return Err(AppError::Forbidden);
        }
        input.validate()?;

        let mut updated = input.into_record(author_id);
        updated.id = existing.id;
        updated.created_at = existing.created_at;
        self.repo.update_recipe(updated.clone()).await?;
        RECIPES.invalidate(&self.cache, None).await;
        Ok(updated)
    }

    pub async fn delete(&self, author_id: Uuid, recipe_id: Uuid) -> Result<(), AppError> {
        let existing = self.repo.find_recipe(recipe_id).await?;
        if existing.author_id != author_id {
            return Err(AppError::Forbidden);
        }
        self.repo.delete_recipe(recipe_id).await?;
        RECIPES.invalidate(&self.cache, None).await;
        Ok(())
    }

    pub async fn favorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<(), AppError> {
        if !self.repo.add_favorite(user_id, recipe_id).await? {
            // Duplicate: nothing changed, so nothing to invalidate.
            return Err(AppError::validation("recipe is already in favorites"));
        }
        let tag = user_id.to_string();
        FAVORITES.invalidate(&self.cache, Some(&tag)).await;
        Ok(())
    }

    pub async fn unfavorite(&self, user_id: Uuid, recipe_id: Uuid) -> Result<(), AppError> {
        if !self.repo.remove_favorite(user_id, recipe_id).await? {
            return Err(AppError::validation("recipe is not in favorites"));
        }
        let tag = user_id.to_string();
        FAVORITES.invalidate(&self.cache, Some(&tag)).await;
        Ok(())
    }

    pub async fn add_to_cart(&self, user_id: Uuid, recipe_id: Uuid) -> Result<(), AppError> {
        if !self.repo.add_cart_item(user_id, recipe_id).await? {
            return Err(AppError::validation("recipe is already in shopping cart"));
        }
        let tag = user_id.to_string();
        SHOPPING_CART.invalidate(&self.cache, Some(&tag)).await;
        Ok(())
    }

    pub async fn remove_from_cart(&self, user_id: Uuid, recipe_id: Uuid) -> Result<(), AppError> {
        if !self.repo.remove_cart_item(user_id, recipe_id).await? {
            return Err(AppError::validation("recipe is not in shopping cart"));
        }
        let tag = user_id.to_string();
        SHOPPING_CART.invalidate(&self.cache, Some(&tag)).await;
        Ok(())
    }

    pub async fn invalidate_ingredients(&self) {
        INGREDIENTS.invalidate(&self.cache, None).await;
    }

    /// Recipe as served: the record plus the caller's `is_favorited` flag
    /// when an identity is known.
    async fn recipe_json(
        &self,
        identity: Option<Uuid>,
        recipe: &RecipeRecord,
    ) -> Result<Value, AppError> {
        let mut body = serde_json::to_value(recipe)
            .map_err(|err| AppError::unexpected(format!("recipe serialization failed: {err}")))?;
        if let Some(user_id) = identity {
            let favorited = self.repo.is_favorited(user_id, recipe.id).await?;
            body["is_favorited"] = json!(favorited);
        }
        Ok(body)
    }
}
