/// Task model
///
/// A task is the owning side of the user/task relation: it holds the id of
/// the user it belongs to, and the id of the project it is filed under.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('TODO', 'IN_PROGRESS', 'DONE');
///
/// CREATE TABLE tasks (
///     id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     status task_status NOT NULL DEFAULT 'TODO',
///     user_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
///     project_id BIGINT REFERENCES projects(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use super::{Entity, ProjectId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Board column a task sits in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }
}

/// Persisted task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,

    /// Owning user (None once detached)
    pub user_id: Option<UserId>,

    /// Project context
    pub project_id: Option<ProjectId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unpersisted task
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub user_id: Option<UserId>,
    pub project_id: Option<ProjectId>,
}

/// Replacement values for an existing task
///
/// Title, description and status always overwrite the stored values. Each
/// reference has three states:
///
/// - absent (`None`): the stored reference is kept
/// - `null` (`Some(None)`): the reference is cleared
/// - an id (`Some(Some(id))`): the reference is replaced
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<Option<UserId>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub project_id: Option<Option<ProjectId>>,
}

/// Deserializes a field that is present in the payload, `null` included
///
/// Paired with `#[serde(default)]`, an absent field stays `None` while an
/// explicit `null` becomes `Some(None)`.
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UpdateTask {
    /// Owner after applying this update to a task currently owned by `current`
    pub fn owner_after(&self, current: Option<UserId>) -> Option<UserId> {
        self.user_id.unwrap_or(current)
    }

    /// Project after applying this update to a task currently filed under `current`
    pub fn project_after(&self, current: Option<ProjectId>) -> Option<ProjectId> {
        self.project_id.unwrap_or(current)
    }
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

impl Entity for Task {
    type Id = TaskId;
    type Draft = NewTask;

    const NAME: &'static str = "Task";

    fn id(&self) -> TaskId {
        self.id
    }
}
