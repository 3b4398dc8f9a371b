/// User model
///
/// A user owns tasks (one-to-many, the user is the "one" side) and takes part
/// in projects (many-to-many through the `user_projects` join table).
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('USER', 'ADMIN');
///
/// CREATE TABLE users (
///     id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
///     username VARCHAR(255) NOT NULL,
///     email VARCHAR(255),
///     password VARCHAR(255),
///     role user_role NOT NULL DEFAULT 'USER',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `task_ids` and `project_ids` are never stored on the user row. Stores
/// derive them from `tasks.user_id` and `user_projects` when loading.

use super::{Entity, ProjectId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role granted to a user account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular account
    #[default]
    User,

    /// Administrative account
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

/// Persisted user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier
    pub id: UserId,

    /// Login name, required
    pub username: String,

    /// Contact address
    pub email: Option<String>,

    /// Opaque credential, passed through untouched
    pub password: Option<String>,

    pub role: Role,

    /// Tasks owned by this user
    #[serde(default)]
    pub task_ids: BTreeSet<TaskId>,

    /// Projects this user is a member of
    #[serde(default)]
    pub project_ids: BTreeSet<ProjectId>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Unpersisted user
///
/// Inserting a `NewUser` through a repository yields a [`User`] carrying the
/// store-assigned id. Memberships listed in `project_ids` are written in the
/// same store call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub project_ids: BTreeSet<ProjectId>,
}

/// Replacement values for an existing user
///
/// Scalar fields always overwrite the stored ones. `project_ids` replaces the
/// user's memberships only when present; `None` leaves them untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUser {
    pub username: String,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub project_ids: Option<BTreeSet<ProjectId>>,
}

impl NewUser {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }
}

impl Entity for User {
    type Id = UserId;
    type Draft = NewUser;

    const NAME: &'static str = "User";

    fn id(&self) -> UserId {
        self.id
    }
}
