//! Task API endpoints
//!
//! RESTful API over the task lifecycle service. Every handler resolves the
//! caller's principal from the bearer token before touching the service;
//! the ownership and role rules themselves live in the core.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use td_core::principal::{Principal, UserId};
use td_core::task::{Page, PageMeta, SortField, SortOrder, Task, TaskId, TaskPatch, TaskQuery};
use td_core::Error as CoreError;

use crate::auth;
use crate::routes::auth::{map_auth_error, route_error, RouteError};
use crate::state::AppState;

const MAX_TITLE_LENGTH: usize = 255;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateTaskRequest {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskRequest {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_done: Option<bool>,
    #[serde(default)]
    priority: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct ListTasksQuery {
    #[serde(default)]
    page: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    is_done: Option<bool>,
    #[serde(default)]
    search: Option<String>,
    #[serde(default, rename = "sortBy")]
    sort_by: Option<SortField>,
    #[serde(default, rename = "sortOrder")]
    sort_order: Option<SortOrder>,
}

impl From<ListTasksQuery> for TaskQuery {
    fn from(query: ListTasksQuery) -> Self {
        let defaults = TaskQuery::default();
        Self {
            page: query.page.unwrap_or(defaults.page),
            limit: query.limit.unwrap_or(defaults.limit),
            is_done: query.is_done,
            search: query.search,
            sort_by: query.sort_by.unwrap_or_default(),
            sort_order: query.sort_order.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskResponse {
    id: TaskId,
    title: String,
    description: Option<String>,
    is_done: bool,
    priority: i32,
    owner_id: UserId,
    created_at: String,
    deleted_at: Option<String>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            is_done: task.is_done,
            priority: task.priority,
            owner_id: task.owner_id,
            created_at: task.created_at.to_rfc3339(),
            deleted_at: task.deleted_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
struct PageResponse {
    data: Vec<TaskResponse>,
    meta: PageMeta,
}

impl From<Page<Task>> for PageResponse {
    fn from(page: Page<Task>) -> Self {
        Self {
            data: page.data.into_iter().map(TaskResponse::from).collect(),
            meta: page.meta,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn map_core_error(err: CoreError) -> RouteError {
    let status = match &err {
        CoreError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoreError::InvalidState(_) => StatusCode::CONFLICT,
        CoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    route_error(status, err.to_string())
}

fn validate_title(title: &str) -> Result<(), RouteError> {
    if title.trim().is_empty() {
        return Err(route_error(
            StatusCode::BAD_REQUEST,
            "Title cannot be empty",
        ));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(route_error(
            StatusCode::BAD_REQUEST,
            format!("Title cannot be longer than {} characters", MAX_TITLE_LENGTH),
        ));
    }
    Ok(())
}

async fn principal_from_headers(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Principal, RouteError> {
    auth::resolve_principal(state.user_store(), headers)
        .await
        .map_err(map_auth_error)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/tasks - List the caller's active tasks
async fn list_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<PageResponse>, RouteError> {
    let principal = principal_from_headers(&state, &headers).await?;
    let page = state
        .tasks()
        .find_active(&principal, &query.into())
        .await
        .map_err(map_core_error)?;
    Ok(Json(page.into()))
}

/// GET /api/tasks/deleted - List the caller's soft-deleted tasks
async fn list_deleted_tasks(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<PageResponse>, RouteError> {
    let principal = principal_from_headers(&state, &headers).await?;
    let page = state
        .tasks()
        .find_deleted(&principal, &query.into())
        .await
        .map_err(map_core_error)?;
    Ok(Json(page.into()))
}

/// POST /api/tasks - Create a new task
async fn create_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), RouteError> {
    let principal = principal_from_headers(&state, &headers).await?;
    validate_title(&req.title)?;

    let task = state
        .tasks()
        .create(&principal, req.title, req.description, req.priority)
        .await
        .map_err(map_core_error)?;

    Ok((StatusCode::CREATED, Json(TaskResponse::from(task))))
}

/// GET /api/tasks/:id - Get a single task
async fn get_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskResponse>, RouteError> {
    let principal = principal_from_headers(&state, &headers).await?;
    let task = state
        .tasks()
        .get_authorized(&principal, id)
        .await
        .map_err(map_core_error)?;
    Ok(Json(TaskResponse::from(task)))
}

/// PATCH /api/tasks/:id - Partially update a task
async fn update_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, RouteError> {
    let principal = principal_from_headers(&state, &headers).await?;
    if let Some(title) = &req.title {
        validate_title(title)?;
    }

    let patch = TaskPatch {
        title: req.title,
        description: req.description,
        is_done: req.is_done,
        priority: req.priority,
    };
    let task = state
        .tasks()
        .update(&principal, id, patch)
        .await
        .map_err(map_core_error)?;
    Ok(Json(TaskResponse::from(task)))
}

/// DELETE /api/tasks/:id - Soft-delete a task
async fn delete_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, RouteError> {
    let principal = principal_from_headers(&state, &headers).await?;
    state
        .tasks()
        .remove(&principal, id)
        .await
        .map_err(map_core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/tasks/:id/restore - Bring a soft-deleted task back
async fn restore_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskResponse>, RouteError> {
    // Authentication only: restore performs no ownership check
    principal_from_headers(&state, &headers).await?;
    let task = state.tasks().restore(id).await.map_err(map_core_error)?;
    Ok(Json(TaskResponse::from(task)))
}

/// DELETE /api/tasks/:id/purge - Permanently remove a task (admin only)
async fn purge_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, RouteError> {
    let principal = principal_from_headers(&state, &headers).await?;
    state
        .tasks()
        .permanently_remove(&principal, id)
        .await
        .map_err(map_core_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Router
// ============================================================================

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/deleted", get(list_deleted_tasks))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/tasks/{id}/restore", post(restore_task))
        .route("/api/tasks/{id}/purge", delete(purge_task))
}
