/// Repository abstraction over the relational store
///
/// This module defines the persistence contracts the service layer is
/// written against, plus the two stores implementing them:
///
/// - `postgres`: PostgreSQL through a `sqlx` connection pool
/// - `memory`: in-process tables, used by tests and local development
///
/// # Contracts
///
/// - [`Repository<E>`]: generic fetch/insert/save/delete by id for one entity
/// - [`UserRepository`]: user save together with its memberships
/// - [`ProjectRepository`]: project save together with its members
/// - [`TaskRepository`]: task queries by owner and project
/// - [`MembershipRepository`]: the user/project join relation
/// - [`StoreBackend`]: backend name and liveness probe
///
/// Every repository call is atomic: it runs in one transaction on
/// PostgreSQL and under one write lock in memory. Writes that touch several
/// tables (insert with memberships, save with memberships, delete with its
/// referential actions) are single calls, so a failure leaves nothing
/// behind.
///
/// Both stores enforce the same referential actions on delete:
///
/// | relation            | on delete of parent        |
/// |---------------------|----------------------------|
/// | `tasks.user_id`     | set to NULL (detach)       |
/// | `tasks.project_id`  | cascade                    |
/// | `user_projects.*`   | cascade                    |

use crate::models::{Entity, Project, ProjectId, Task, User, UserId};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// SQLSTATE reported by PostgreSQL for a foreign key violation
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The row addressed by a save no longer exists
    #[error("record not found")]
    NotFound,

    /// A write referenced a row that does not exist
    #[error("foreign key violation: {0}")]
    ForeignKey(String),

    /// Any other database failure (connectivity, constraint, protocol)
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Schema migration failed
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("foreign key").to_string();
                return StoreError::ForeignKey(constraint);
            }
        }

        StoreError::Database(err)
    }
}

/// Generic persistence contract for one entity type
///
/// `insert` is the only way to obtain an id: it takes a draft and returns the
/// persisted entity. `save` replaces the scalar fields of an already
/// persisted entity; association sets on the passed value are ignored,
/// since they are derived from other tables.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Returns every record, ordered by id
    async fn find_all(&self) -> StoreResult<Vec<E>>;

    async fn find_by_id(&self, id: E::Id) -> StoreResult<Option<E>>;

    /// Returns the records whose ids are listed, ordered by id
    ///
    /// Unknown ids are skipped.
    async fn find_many(&self, ids: &[E::Id]) -> StoreResult<Vec<E>>;

    async fn exists(&self, id: E::Id) -> StoreResult<bool>;

    /// Persists a draft and assigns its id
    async fn insert(&self, draft: E::Draft) -> StoreResult<E>;

    /// Replaces the stored record matching `entity.id()`
    ///
    /// Returns [`StoreError::NotFound`] if the record is gone.
    async fn save(&self, entity: E) -> StoreResult<E>;

    /// Removes a record, returning whether one was removed
    ///
    /// The referential actions of the schema run in the same write.
    async fn delete_by_id(&self, id: E::Id) -> StoreResult<bool>;
}

/// User writes spanning the membership relation
#[async_trait]
pub trait UserRepository: Repository<User> {
    /// Replaces the scalar fields of a user and, when `project_ids` is
    /// given, makes it the user's exact membership set
    ///
    /// Either everything is written or nothing is.
    async fn save_with_projects(
        &self,
        user: User,
        project_ids: Option<&BTreeSet<ProjectId>>,
    ) -> StoreResult<User>;
}

/// Project writes spanning the membership relation
#[async_trait]
pub trait ProjectRepository: Repository<Project> {
    /// Replaces the scalar fields of a project and, when `member_ids` is
    /// given, makes it the project's exact member set
    ///
    /// Either everything is written or nothing is.
    async fn save_with_members(
        &self,
        project: Project,
        member_ids: Option<&BTreeSet<UserId>>,
    ) -> StoreResult<Project>;
}

/// Task queries beyond the generic contract
#[async_trait]
pub trait TaskRepository: Repository<Task> {
    /// Tasks owned by a user, ordered by id
    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Vec<Task>>;

    /// Tasks filed under a project, ordered by id
    async fn find_by_project(&self, project_id: ProjectId) -> StoreResult<Vec<Task>>;
}

/// The user/project join relation
///
/// Membership is stored once, as a pair, so `User::project_ids` and
/// `Project::member_ids` are always mirror images of each other.
#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// Adds a membership, returning false if it already existed
    async fn add(&self, user_id: UserId, project_id: ProjectId) -> StoreResult<bool>;

    /// Removes a membership, returning whether it existed
    async fn remove(&self, user_id: UserId, project_id: ProjectId) -> StoreResult<bool>;

    async fn projects_of(&self, user_id: UserId) -> StoreResult<Vec<ProjectId>>;

    async fn members_of(&self, project_id: ProjectId) -> StoreResult<Vec<UserId>>;
}

/// Identity and liveness of the store behind the repositories
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Short backend name ("postgres", "memory")
    fn name(&self) -> &'static str;

    /// Round-trips the store to check it is reachable
    async fn ping(&self) -> StoreResult<()>;
}

/// Handles to every repository, all backed by the same store
///
/// Cloning is cheap: every handle is an `Arc`.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub tasks: Arc<dyn TaskRepository>,
    pub memberships: Arc<dyn MembershipRepository>,
    pub backend: Arc<dyn StoreBackend>,
}

impl Repositories {
    /// Wires every repository handle to one store
    pub fn from_store<S>(store: S) -> Self
    where
        S: UserRepository
            + ProjectRepository
            + TaskRepository
            + MembershipRepository
            + StoreBackend
            + 'static,
    {
        let store = Arc::new(store);

        Self {
            users: store.clone(),
            projects: store.clone(),
            tasks: store.clone(),
            memberships: store.clone(),
            backend: store,
        }
    }

    /// Repositories over a fresh, empty in-memory store
    pub fn in_memory() -> Self {
        Self::from_store(MemoryStore::new())
    }

    /// Repositories over a PostgreSQL pool
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::from_store(PgStore::new(pool))
    }
}
