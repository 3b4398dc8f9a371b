/// Project model
///
/// A project groups member users (inverse side of the user/project
/// membership) and tasks.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE TABLE user_projects (
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     PRIMARY KEY (user_id, project_id)
/// );
/// ```

use super::{Entity, ProjectId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Persisted project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: Option<String>,

    /// Users participating in this project
    #[serde(default)]
    pub member_ids: BTreeSet<UserId>,

    /// Tasks filed under this project
    #[serde(default)]
    pub task_ids: BTreeSet<TaskId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unpersisted project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub member_ids: BTreeSet<UserId>,
}

/// Replacement values for an existing project
///
/// `member_ids` replaces the membership set only when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProject {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub member_ids: Option<BTreeSet<UserId>>,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

impl Entity for Project {
    type Id = ProjectId;
    type Draft = NewProject;

    const NAME: &'static str = "Project";

    fn id(&self) -> ProjectId {
        self.id
    }
}
