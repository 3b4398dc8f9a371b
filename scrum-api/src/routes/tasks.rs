/// Task endpoints
///
/// # Endpoints
///
/// - `POST /v1/tasks` - Create task
/// - `GET /v1/tasks` - List tasks
/// - `GET /v1/tasks/:id` - Get task
/// - `PUT /v1/tasks/:id` - Replace task fields
/// - `DELETE /v1/tasks/:id` - Delete task
///
/// Tasks are returned as [`TaskView`], with the owner nested as a summary.
///
/// # Request body
///
/// ```json
/// {
///   "title": "Write release notes",
///   "description": "for 0.2",
///   "status": "IN_PROGRESS",
///   "user_id": 1,
///   "project_id": 3
/// }
/// ```

use crate::{
    app::AppState,
    error::{validated, ApiError, ApiResult},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use scrum_shared::{
    models::{task::present, NewTask, ProjectId, Task, TaskId, TaskStatus, UpdateTask, UserId},
    views::{index_by_id, TaskView},
};
use serde::Deserialize;
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    pub user_id: Option<UserId>,

    pub project_id: Option<ProjectId>,
}

/// Update task request
///
/// Title, description and status are replaced. An absent `user_id` or
/// `project_id` keeps the stored reference; an explicit `null` clears it.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default, deserialize_with = "present")]
    pub user_id: Option<Option<UserId>>,

    #[serde(default, deserialize_with = "present")]
    pub project_id: Option<Option<ProjectId>>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(req: CreateTaskRequest) -> Self {
        NewTask {
            title: req.title,
            description: req.description,
            status: req.status,
            user_id: req.user_id,
            project_id: req.project_id,
        }
    }
}

impl From<UpdateTaskRequest> for UpdateTask {
    fn from(req: UpdateTaskRequest) -> Self {
        UpdateTask {
            title: req.title,
            description: req.description,
            status: req.status,
            user_id: req.user_id,
            project_id: req.project_id,
        }
    }
}

/// Builds views for `tasks`, loading only the owners they reference
pub(crate) async fn task_views(state: &AppState, tasks: Vec<Task>) -> ApiResult<Vec<TaskView>> {
    let mut owner_ids: Vec<UserId> = tasks.iter().filter_map(|t| t.user_id).collect();
    owner_ids.sort();
    owner_ids.dedup();

    let owners = state.services.users.get_users_by_ids(&owner_ids).await?;
    let owners = index_by_id(owners, |u| u.id);

    Ok(tasks
        .into_iter()
        .map(|task| TaskView::new(task, &owners))
        .collect())
}

async fn task_view(state: &AppState, task: Task) -> ApiResult<TaskView> {
    let mut views = task_views(state, vec![task]).await?;
    views
        .pop()
        .ok_or_else(|| ApiError::InternalError("task view was not built".to_string()))
}

/// Create task
///
/// # Errors
///
/// - `400 Bad Request`: Malformed JSON or empty title
/// - `422 Unprocessable Entity`: `user_id` or `project_id` does not exist
pub async fn create_task(
    State(state): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let req = validated(payload)?;

    let task = state.services.tasks.create_task(req.into()).await?;

    Ok((StatusCode::CREATED, Json(task_view(&state, task).await?)))
}

pub async fn list_tasks(State(state): State<AppState>) -> ApiResult<Json<Vec<TaskView>>> {
    let tasks = state.services.tasks.get_all_tasks().await?;

    Ok(Json(task_views(&state, tasks).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    path: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<Json<TaskView>> {
    let Path(id) = path?;

    let task = state
        .services
        .tasks
        .get_task_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Task not found: {}", id)))?;

    Ok(Json(task_view(&state, task).await?))
}

/// Replace task fields
///
/// References absent from the body are kept.
///
/// # Errors
///
/// - `400 Bad Request`: Malformed JSON or empty title
/// - `404 Not Found`: No task with this id
/// - `422 Unprocessable Entity`: `user_id` or `project_id` does not exist
pub async fn update_task(
    State(state): State<AppState>,
    path: Result<Path<TaskId>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<TaskView>> {
    let Path(id) = path?;
    let req = validated(payload)?;

    let task = state.services.tasks.update_task(id, req.into()).await?;

    Ok(Json(task_view(&state, task).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    path: Result<Path<TaskId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;

    state.services.tasks.delete_task(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
