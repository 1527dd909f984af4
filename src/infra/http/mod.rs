//! HTTP surface: recipe CRUD plus background task submission and status.

mod recipes;
mod tasks;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use uuid::Uuid;

use crate::application::RecipeService;
use crate::application::error::AppError;
use crate::application::tasks::{TaskQueue, TaskStatusTracker};
use crate::cache::CachedPayload;

/// Caller identity header. Requests without it are treated as anonymous.
const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub recipes: Arc<RecipeService>,
    pub tasks: TaskQueue,
    pub tracker: Arc<TaskStatusTracker>,
    /// Bound on how long the health endpoint waits for its probe task.
    pub health_wait: Duration,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/recipes",
            get(recipes::list_recipes).post(recipes::create_recipe),
        )
        .route(
            "/api/recipes/download_shopping_cart",
            get(recipes::download_shopping_cart),
        )
        .route(
            "/api/recipes/{id}",
            get(recipes::get_recipe)
                .put(recipes::update_recipe)
                .delete(recipes::delete_recipe),
        )
        .route(
            "/api/recipes/{id}/favorite",
            post(recipes::add_favorite).delete(recipes::remove_favorite),
        )
        .route(
            "/api/recipes/{id}/shopping_cart",
            post(recipes::add_to_cart).delete(recipes::remove_from_cart),
        )
        .route("/api/ingredients", get(recipes::list_ingredients))
        .route("/api/ingredients/{id}", get(recipes::get_ingredient))
        .route("/api/tasks/import-recipe", post(tasks::import_recipe))
        .route("/api/tasks/search-product", post(tasks::search_product))
        .route("/api/tasks/health", get(tasks::health))
        .route("/api/tasks/{task_id}", get(tasks::task_status))
        .with_state(state)
}

/// Caller identity from the `X-User-Id` header, if present.
fn identity(headers: &HeaderMap) -> Result<Option<Uuid>, AppError> {
    let Some(value) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| AppError::validation("invalid X-User-Id header"))?;
    let user_id = Uuid::parse_str(raw).map_err(|_| AppError::validation("invalid X-User-Id header"))?;
    Ok(Some(user_id))
}

/// Caller identity, required. Anonymous requests are rejected.
fn require_identity(headers: &HeaderMap) -> Result<Uuid, AppError> {
    identity(headers)?.ok_or(AppError::Unauthorized)
}

/// Turn a cached payload back into an HTTP response.
fn payload_response(payload: CachedPayload) -> Response {
    let status = StatusCode::from_u16(payload.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(payload.body)).into_response()
}
