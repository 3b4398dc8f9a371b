/// Entity model for the scrum backend
///
/// # Models
///
/// - `user`: User accounts with a role
/// - `project`: Projects with member users
/// - `task`: Tasks owned by a user and filed under a project
///
/// Associations are held as sets of foreign identifiers, never as nested
/// entities, so no entity owns another and there is no reference cycle to
/// walk. Every entity comes in two phases: a draft without an id
/// (`NewUser`, `NewProject`, `NewTask`) and the persisted record with the
/// id assigned by the store.
///
/// # Example
///
/// ```no_run
/// use scrum_shared::models::user::NewUser;
/// use scrum_shared::repo::Repositories;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repos = Repositories::in_memory();
///
/// let user = repos.users.insert(NewUser::new("john_doe")).await?;
/// println!("Created user: {}", user.id);
/// # Ok(())
/// # }
/// ```

use std::fmt;

pub mod ids;
pub mod project;
pub mod task;
pub mod user;

pub use ids::{ProjectId, TaskId, UserId};
pub use project::{NewProject, Project, UpdateProject};
pub use task::{NewTask, Task, TaskStatus, UpdateTask};
pub use user::{NewUser, Role, UpdateUser, User};

/// A record persisted under a store-assigned identifier
pub trait Entity: Clone + Send + Sync + 'static {
    /// Identifier type, assigned once on insert
    type Id: Copy + Eq + Ord + fmt::Display + fmt::Debug + Send + Sync + 'static;

    /// Unpersisted form accepted by `Repository::insert`
    type Draft: Send + 'static;

    /// Human-readable entity name used in errors and logs
    const NAME: &'static str;

    fn id(&self) -> Self::Id;
}
