/// Service layer
///
/// One service per entity. Services own the business rules the store cannot
/// express on its own:
///
/// - existence checks that turn a missing id into [`ServiceError::NotFound`]
/// - reference checks that turn a dangling foreign id into
///   [`ServiceError::InvalidReference`]
/// - maintenance of the user/project membership and the user/task ownership
///   when either side is updated or deleted
///
/// A service call issues at most one repository write, so it either takes
/// effect entirely or not at all.
///
/// # Delete policies
///
/// | deleted | owned tasks                 | memberships |
/// |---------|-----------------------------|-------------|
/// | user    | detached (`user_id = None`) | removed     |
/// | project | deleted                     | removed     |
///
/// # Example
///
/// ```
/// use scrum_shared::models::user::NewUser;
/// use scrum_shared::repo::Repositories;
/// use scrum_shared::service::Services;
///
/// # async fn example() -> Result<(), scrum_shared::service::ServiceError> {
/// let services = Services::new(Repositories::in_memory());
///
/// let user = services.users.create_user(NewUser::new("john_doe")).await?;
/// assert!(services.users.get_user_by_id(user.id).await?.is_some());
/// # Ok(())
/// # }
/// ```

use crate::models::Entity;
use crate::repo::{Repositories, Repository, StoreError};
use std::fmt;

pub mod project_service;
pub mod task_service;
pub mod user_service;

pub use project_service::ProjectService;
pub use task_service::TaskService;
pub use user_service::UserService;

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by the service layer
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The addressed entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A payload points at a related entity that does not exist
    #[error("referenced {entity} does not exist: {id}")]
    InvalidReference { entity: &'static str, id: String },

    /// The store failed; not recoverable within the request
    #[error("store failure: {0}")]
    Store(#[source] StoreError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, id: impl fmt::Display) -> Self {
        ServiceError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_reference(entity: &'static str, id: impl fmt::Display) -> Self {
        ServiceError::InvalidReference {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            // A reference vanished between our check and the write
            StoreError::ForeignKey(constraint) => ServiceError::InvalidReference {
                entity: referenced_entity(&constraint),
                id: constraint,
            },
            other => ServiceError::Store(other),
        }
    }
}

/// Maps a foreign key constraint name to the entity it points at
fn referenced_entity(constraint: &str) -> &'static str {
    if constraint.ends_with("user_id_fkey") {
        "User"
    } else if constraint.ends_with("project_id_fkey") {
        "Project"
    } else {
        "entity"
    }
}

/// Maps a store `NotFound` raised by `save` to the entity that vanished
fn vanished<E: Entity>(id: E::Id) -> impl FnOnce(StoreError) -> ServiceError {
    move |err| match err {
        StoreError::NotFound => ServiceError::not_found(E::NAME, id),
        other => other.into(),
    }
}

/// Fails with `NotFound` unless the entity exists
async fn require<E, R>(repo: &R, id: E::Id) -> ServiceResult<()>
where
    E: Entity,
    R: Repository<E> + ?Sized,
{
    if repo.exists(id).await? {
        Ok(())
    } else {
        Err(ServiceError::not_found(E::NAME, id))
    }
}

/// Fails with `InvalidReference` unless every referenced entity exists
async fn check_references<E, R, I>(repo: &R, ids: I) -> ServiceResult<()>
where
    E: Entity,
    R: Repository<E> + ?Sized,
    I: IntoIterator<Item = E::Id>,
{
    for id in ids {
        if !repo.exists(id).await? {
            return Err(ServiceError::invalid_reference(E::NAME, id));
        }
    }
    Ok(())
}

/// Every service, sharing one set of repositories
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub projects: ProjectService,
    pub tasks: TaskService,
}

impl Services {
    pub fn new(repos: Repositories) -> Self {
        Self {
            users: UserService::new(repos.clone()),
            projects: ProjectService::new(repos.clone()),
            tasks: TaskService::new(repos),
        }
    }
}
