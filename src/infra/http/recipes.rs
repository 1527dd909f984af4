//! Recipe and ingredient handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{AppState, identity, payload_response, require_identity};
use crate::application::error::AppError;
use crate::domain::recipes::NewRecipe;
use crate::infra::repo::RecipeFilter;

#[derive(Debug, Deserialize, Default)]
pub(super) struct ListQuery {
    page: Option<usize>,
    limit: Option<usize>,
    author: Option<Uuid>,
    search: Option<String>,
}

impl From<ListQuery> for RecipeFilter {
    fn from(query: ListQuery) -> Self {
        Self {
            author: query.author,
            search: query.search.filter(|s| !s.trim().is_empty()),
            page: query.page.unwrap_or(1),
            limit: query.limit.unwrap_or(0),
        }
    }
}

pub(super) async fn list_recipes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Response, AppError> {
    let identity = identity(&headers)?;
    let payload = state.recipes.list(identity, query.into()).await?;
    Ok(payload_response(payload))
}

pub(super) async fn get_recipe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let identity = identity(&headers)?;
    let payload = state.recipes.detail(identity, id).await?;
    Ok(payload_response(payload))
}

pub(super) async fn list_ingredients(
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let payload = state.recipes.list_ingredients().await?;
    Ok(payload_response(payload))
}

pub(super) async fn get_ingredient(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let payload = state.recipes.ingredient_detail(id).await?;
    Ok(payload_response(payload))
}

pub(super) async fn download_shopping_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let user = require_identity(&headers)?;
    let content = state.recipes.download_shopping_cart(user).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"shopping_list.txt\"",
            ),
        ],
        content,
    )
        .into_response())
}

pub(super) async fn create_recipe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewRecipe>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let author = require_identity(&headers)?;
    let recipe = state.recipes.create(author, input).await?;
    let body = serde_json::to_value(&recipe)
        .map_err(|err| AppError::unexpected(format!("recipe serialization failed: {err}")))?;
    Ok((StatusCode::CREATED, Json(body)))
}

pub(super) async fn update_recipe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<NewRecipe>,
) -> Result<Json<serde_json::Value>, AppError> {
    let author = require_identity(&headers)?;
    let recipe = state.recipes.update(author, id, input).await?;
    let body = serde_json::to_value(&recipe)
        .map_err(|err| AppError::unexpected(format!("recipe serialization failed: {err}")))?;
    Ok(Json(body))
}

pub(super) async fn delete_recipe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let author = require_identity(&headers)?;
    state.recipes.delete(author, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn add_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let user = require_identity(&headers)?;
    state.recipes.favorite(user, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "detail": "recipe added to favorites" })),
    ))
}

pub(super) async fn remove_favorite(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user = require_identity(&headers)?;
    state.recipes.unfavorite(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn add_to_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let user = require_identity(&headers)?;
    state.recipes.add_to_cart(user, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "detail": "recipe added to shopping cart" })),
    ))
}

pub(super) async fn remove_from_cart(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let user = require_identity(&headers)?;
    state.recipes.remove_from_cart(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
