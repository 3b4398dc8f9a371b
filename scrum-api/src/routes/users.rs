/// User endpoints
///
/// # Endpoints
///
/// - `POST /v1/users` - Create user
/// - `GET /v1/users` - List users
/// - `GET /v1/users/:id` - Get user
/// - `PUT /v1/users/:id` - Replace user fields
/// - `DELETE /v1/users/:id` - Delete user
/// - `GET /v1/users/:id/tasks` - Tasks owned by the user
/// - `GET /v1/users/:id/projects` - Projects the user is a member of
///
/// Users are returned as [`UserView`]: their projects are nested as
/// summaries and their tasks are only reachable through `/tasks`.

use super::tasks::task_views;
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
    models::{NewUser, ProjectId, Role, UpdateUser, User, UserId},
    views::{index_by_id, ProjectView, TaskView, UserView},
};
use serde::Deserialize;
use std::collections::BTreeSet;
use validator::Validate;

/// Create user request
///
/// An `id` in the body is ignored.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Username must be 1-255 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,

    #[serde(default)]
    pub role: Role,

    /// Projects to join on creation
    #[serde(default)]
    pub project_ids: BTreeSet<ProjectId>,
}

/// Update user request
///
/// Every scalar field is replaced. Memberships are replaced only when
/// `project_ids` is present.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Username must be 1-255 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub project_ids: Option<BTreeSet<ProjectId>>,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        NewUser {
            username: req.username,
            email: req.email,
            password: req.password,
            role: req.role,
            project_ids: req.project_ids,
        }
    }
}

impl From<UpdateUserRequest> for UpdateUser {
    fn from(req: UpdateUserRequest) -> Self {
        UpdateUser {
            username: req.username,
            email: req.email,
            password: req.password,
            role: req.role,
            project_ids: req.project_ids,
        }
    }
}

/// Builds the view of `user` from the project ids it already carries
///
/// A project deleted since the user was loaded is left out of the view.
async fn user_view(state: &AppState, user: User) -> ApiResult<UserView> {
    let project_ids: Vec<ProjectId> = user.project_ids.iter().copied().collect();
    let projects = state.services.projects.get_projects_by_ids(&project_ids).await?;

    Ok(UserView::new(user, &index_by_id(projects, |p| p.id)))
}

/// Create user
///
/// # Errors
///
/// - `400 Bad Request`: Malformed JSON or invalid field
/// - `422 Unprocessable Entity`: A listed project does not exist
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserView>)> {
    let req = validated(payload)?;

    let user = state.services.users.create_user(req.into()).await?;

    Ok((StatusCode::CREATED, Json(user_view(&state, user).await?)))
}

/// List users, ordered by id
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<UserView>>> {
    let users = state.services.users.get_all_users().await?;
    let projects = index_by_id(state.services.projects.get_all_projects().await?, |p| p.id);

    Ok(Json(
        users
            .into_iter()
            .map(|user| UserView::new(user, &projects))
            .collect(),
    ))
}

/// Get user
///
/// # Errors
///
/// - `404 Not Found`: No user with this id
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Json<UserView>> {
    let Path(id) = path?;

    let user = state
        .services
        .users
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found: {}", id)))?;

    Ok(Json(user_view(&state, user).await?))
}

/// Replace user fields
///
/// # Errors
///
/// - `400 Bad Request`: Malformed JSON or invalid field
/// - `404 Not Found`: No user with this id
/// - `422 Unprocessable Entity`: A listed project does not exist
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<UserView>> {
    let Path(id) = path?;
    let req = validated(payload)?;

    let user = state.services.users.update_user(id, req.into()).await?;

    Ok(Json(user_view(&state, user).await?))
}

/// Delete user
///
/// Owned tasks are kept with their owner cleared.
///
/// # Errors
///
/// - `404 Not Found`: No user with this id
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;

    state.services.users.delete_user(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Tasks owned by a user, ordered by id
///
/// # Errors
///
/// - `404 Not Found`: No user with this id
pub async fn list_user_tasks(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let Path(id) = path?;

    let tasks = state.services.users.get_user_tasks(id).await?;

    Ok(Json(task_views(&state, tasks).await?))
}

/// Projects a user is a member of, ordered by id
///
/// # Errors
///
/// - `404 Not Found`: No user with this id
pub async fn list_user_projects(
    State(state): State<AppState>,
    path: Result<Path<UserId>, PathRejection>,
) -> ApiResult<Json<Vec<ProjectView>>> {
    let Path(id) = path?;

    let projects = state.services.users.get_user_projects(id).await?;

    Ok(Json(projects.into_iter().map(ProjectView::from).collect()))
}
