/// Project endpoints
///
/// # Endpoints
///
/// - `POST /v1/projects` - Create project
/// - `GET /v1/projects` - List projects
/// - `GET /v1/projects/:id` - Get project
/// - `PUT /v1/projects/:id` - Replace project fields
/// - `DELETE /v1/projects/:id` - Delete project and its tasks
/// - `GET /v1/projects/:id/members` - Project members
/// - `PUT /v1/projects/:id/members/:user_id` - Add member
/// - `DELETE /v1/projects/:id/members/:user_id` - Remove member
/// - `GET /v1/projects/:id/tasks` - Tasks filed under the project

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
    models::{NewProject, ProjectId, UpdateProject, UserId},
    views::{ProjectView, TaskView, UserSummary},
};
use serde::Deserialize;
use std::collections::BTreeSet;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,

    /// Initial members
    #[serde(default)]
    pub member_ids: BTreeSet<UserId>,
}

/// Update project request
///
/// Members are replaced only when `member_ids` is present.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    pub description: Option<String>,

    #[serde(default)]
    pub member_ids: Option<BTreeSet<UserId>>,
}

impl From<CreateProjectRequest> for NewProject {
    fn from(req: CreateProjectRequest) -> Self {
        NewProject {
            name: req.name,
            description: req.description,
            member_ids: req.member_ids,
        }
    }
}

impl From<UpdateProjectRequest> for UpdateProject {
    fn from(req: UpdateProjectRequest) -> Self {
        UpdateProject {
            name: req.name,
            description: req.description,
            member_ids: req.member_ids,
        }
    }
}

pub async fn create_project(
    State(state): State<AppState>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProjectView>)> {
    let req = validated(payload)?;

    let project = state.services.projects.create_project(req.into()).await?;

    Ok((StatusCode::CREATED, Json(project.into())))
}

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<ProjectView>>> {
    let projects = state.services.projects.get_all_projects().await?;

    Ok(Json(projects.into_iter().map(ProjectView::from).collect()))
}

pub async fn get_project(
    State(state): State<AppState>,
    path: Result<Path<ProjectId>, PathRejection>,
) -> ApiResult<Json<ProjectView>> {
    let Path(id) = path?;

    let project = state
        .services
        .projects
        .get_project_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Project not found: {}", id)))?;

    Ok(Json(project.into()))
}

pub async fn update_project(
    State(state): State<AppState>,
    path: Result<Path<ProjectId>, PathRejection>,
    payload: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> ApiResult<Json<ProjectView>> {
    let Path(id) = path?;
    let req = validated(payload)?;

    let project = state.services.projects.update_project(id, req.into()).await?;

    Ok(Json(project.into()))
}

/// Delete project
///
/// Tasks filed under the project are deleted with it.
pub async fn delete_project(
    State(state): State<AppState>,
    path: Result<Path<ProjectId>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;

    state.services.projects.delete_project(id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Project members as summaries, ordered by id
pub async fn list_members(
    State(state): State<AppState>,
    path: Result<Path<ProjectId>, PathRejection>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let Path(id) = path?;

    let members = state.services.projects.get_project_members(id).await?;

    Ok(Json(members.iter().map(UserSummary::from).collect()))
}

/// Add a member
///
/// Idempotent: adding an existing member also answers 204.
pub async fn add_member(
    State(state): State<AppState>,
    path: Result<Path<(ProjectId, UserId)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path((project_id, user_id)) = path?;

    state.services.projects.add_member(project_id, user_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Remove a member
///
/// # Errors
///
/// - `404 Not Found`: Unknown project or user, or the user is not a member
pub async fn remove_member(
    State(state): State<AppState>,
    path: Result<Path<(ProjectId, UserId)>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path((project_id, user_id)) = path?;

    state
        .services
        .projects
        .remove_member(project_id, user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Tasks filed under a project, ordered by id
pub async fn list_project_tasks(
    State(state): State<AppState>,
    path: Result<Path<ProjectId>, PathRejection>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let Path(id) = path?;

    let tasks = state.services.projects.get_project_tasks(id).await?;

    Ok(Json(task_views(&state, tasks).await?))
}
