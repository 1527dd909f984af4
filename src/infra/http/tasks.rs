//! Background task submission and status handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::AppState;
use crate::application::error::AppError;
use crate::application::tasks::{TaskHandle, TaskSpec, WaitError};

#[derive(Debug, Deserialize, Default)]
pub(super) struct ImportRecipeRequest {
    name: Option<String>,
    #[serde(default)]
    random: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct SearchProductRequest {
    query: String,
}

fn accepted(handle: TaskHandle, message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "success": true,
            "message": message,
            "task_id": handle.task_id,
            "status_url": format!("/api/tasks/{}", handle.task_id),
        })),
    )
}

/// `POST /api/tasks/import-recipe`: queue a TheMealDB lookup. Accepts either
/// `{"random": true}` or `{"name": "..."}`.
pub(super) async fn import_recipe(
    State(state): State<AppState>,
    Json(request): Json<ImportRecipeRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let spec = if request.random {
        TaskSpec::RandomMeal
    } else {
        let name = request
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::validation("either `name` or `random` is required"))?;
        TaskSpec::SearchRecipeByName { name }
    };

    let message = spec.describe();
    let handle = state.tasks.dispatch(spec).await?;
    Ok(accepted(handle, &format!("accepted: {message}")))
}

/// `POST /api/tasks/search-product`: queue an Open Food Facts search.
pub(super) async fn search_product(
    State(state): State<AppState>,
    Json(request): Json<SearchProductRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let query = request.query.trim().to_string();
    if query.is_empty() {
        return Err(AppError::validation("`query` must not be empty"));
    }

    let spec = TaskSpec::SearchProduct { query };
    let message = spec.describe();
    let handle = state.tasks.dispatch(spec).await?;
    Ok(accepted(handle, &format!("accepted: {message}")))
}

/// `GET /api/tasks/{task_id}`: current status snapshot.
pub(super) async fn task_status(
    State(state): State<AppState>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, AppError> {
    match state.tracker.status(task_id) {
        Some(status) => Ok(Json(status).into_response()),
        None => Err(AppError::NotFound),
    }
}

/// `GET /api/tasks/health`: dispatch a probe task and wait (bounded) for the
/// worker to complete it. A worker that cannot turn the probe around within
/// the window reports unhealthy.
pub(super) async fn health(State(state): State<AppState>) -> Response {
    let handle = match state.tasks.dispatch(TaskSpec::HealthCheck).await {
        Ok(handle) => handle,
        Err(err) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "detail": err.to_string(),
                })),
            )
                .into_response();
        }
    };

    match state
        .tracker
        .wait_for_completion(handle.task_id, state.health_wait)
        .await
    {
        Ok(status) if status.successful => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "task_id": handle.task_id,
            })),
        )
            .into_response(),
        Ok(status) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "task_id": handle.task_id,
                "detail": status.error.unwrap_or_else(|| "probe task failed".to_string()),
            })),
        )
            .into_response(),
        Err(WaitError::TimedOut) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "task_id": handle.task_id,
                "detail": "worker did not complete the probe task in time",
            })),
        )
            .into_response(),
        Err(WaitError::Unknown) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "detail": "probe task record disappeared",
            })),
        )
            .into_response(),
    }
}
