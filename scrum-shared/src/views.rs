/// Serialized shapes of entities at the API boundary
///
/// Associations are bidirectional, so serializing both ends naively would
/// loop forever (user → projects → members → projects → ...). The views
/// apply one rule instead:
///
/// - the owning side nests the other end as a summary
/// - the inverse side emits identifiers only, or nothing
/// - summaries never carry associations
///
/// | view          | nested (owning side)     | ids only (inverse side)   | omitted  |
/// |---------------|--------------------------|---------------------------|----------|
/// | `UserView`    | `projects`               |                           | tasks    |
/// | `ProjectView` |                          | `member_ids`, `task_ids`  |          |
/// | `TaskView`    | `user`                   | `project_id`              |          |

use crate::models::{Project, ProjectId, Role, Task, TaskId, TaskStatus, User, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Project fields without associations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
}

/// User fields without associations or credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
}

/// User as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Role,
    pub projects: Vec<ProjectSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectView {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,
    pub member_ids: BTreeSet<UserId>,
    pub task_ids: BTreeSet<TaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Task as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub user: Option<UserSummary>,
    pub project_id: Option<ProjectId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            description: project.description.clone(),
        }
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

impl UserView {
    /// Builds the view, resolving memberships against `projects`
    ///
    /// Membership ids missing from `projects` are skipped.
    pub fn new(user: User, projects: &BTreeMap<ProjectId, Project>) -> Self {
        let projects = user
            .project_ids
            .iter()
            .filter_map(|id| projects.get(id))
            .map(ProjectSummary::from)
            .collect();

        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            password: user.password,
            role: user.role,
            projects,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<Project> for ProjectView {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            member_ids: project.member_ids,
            task_ids: project.task_ids,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

impl TaskView {
    /// Builds the view, resolving the owner against `users`
    pub fn new(task: Task, users: &BTreeMap<UserId, User>) -> Self {
        let user = task
            .user_id
            .and_then(|id| users.get(&id))
            .map(UserSummary::from);

        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            user,
            project_id: task.project_id,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Indexes entities by id for view building
pub fn index_by_id<K: Ord, V>(items: Vec<V>, key: impl Fn(&V) -> K) -> BTreeMap<K, V> {
    items.into_iter().map(|item| (key(&item), item)).collect()
}
