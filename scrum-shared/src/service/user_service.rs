/// User service
///
/// CRUD over users plus the read side of their associations. Deleting a user
/// detaches the tasks it owned and drops its project memberships in the
/// same write that removes the user row, so no task or membership is ever
/// left pointing at a missing user.

use super::{check_references, require, vanished, ServiceError, ServiceResult};
use crate::models::{NewUser, Project, Task, UpdateUser, User, UserId};
use crate::repo::Repositories;
use tracing::info;

#[derive(Clone)]
pub struct UserService {
    repos: Repositories,
}

impl UserService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Creates a user
    ///
    /// No uniqueness check is made on username or email. Projects listed in
    /// `data.project_ids` must exist and become the user's memberships.
    ///
    /// # Errors
    ///
    /// - `InvalidReference` if a listed project does not exist
    pub async fn create_user(&self, data: NewUser) -> ServiceResult<User> {
        check_references(&*self.repos.projects, data.project_ids.iter().copied()).await?;

        let user = self.repos.users.insert(data).await?;

        info!(user_id = %user.id, username = %user.username, "User created");
        Ok(user)
    }

    pub async fn get_all_users(&self) -> ServiceResult<Vec<User>> {
        Ok(self.repos.users.find_all().await?)
    }

    /// Users whose ids are listed, ordered by id; unknown ids are skipped
    pub async fn get_users_by_ids(&self, ids: &[UserId]) -> ServiceResult<Vec<User>> {
        Ok(self.repos.users.find_many(ids).await?)
    }

    /// Looks a user up; an unknown id is `Ok(None)`, not an error
    pub async fn get_user_by_id(&self, id: UserId) -> ServiceResult<Option<User>> {
        Ok(self.repos.users.find_by_id(id).await?)
    }

    /// Overwrites username, email, password and role
    ///
    /// The id never changes. Memberships are replaced only when
    /// `data.project_ids` is set; owned tasks are never touched.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist (nothing is written)
    /// - `InvalidReference` if a listed project does not exist
    pub async fn update_user(&self, id: UserId, data: UpdateUser) -> ServiceResult<User> {
        let mut user = self
            .repos
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", id))?;

        if let Some(project_ids) = &data.project_ids {
            check_references(&*self.repos.projects, project_ids.iter().copied()).await?;
        }

        user.username = data.username;
        user.email = data.email;
        user.password = data.password;
        user.role = data.role;

        let user = self
            .repos
            .users
            .save_with_projects(user, data.project_ids.as_ref())
            .await
            .map_err(vanished::<User>(id))?;

        info!(user_id = %id, role = user.role.as_str(), "User updated");
        Ok(user)
    }

    /// Deletes a user, detaching its tasks and dropping its memberships
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist (nothing is written)
    pub async fn delete_user(&self, id: UserId) -> ServiceResult<()> {
        if !self.repos.users.delete_by_id(id).await? {
            return Err(ServiceError::not_found("User", id));
        }

        info!(user_id = %id, "User deleted");
        Ok(())
    }

    /// Projects the user is a member of, ordered by id
    pub async fn get_user_projects(&self, id: UserId) -> ServiceResult<Vec<Project>> {
        require(&*self.repos.users, id).await?;

        let project_ids = self.repos.memberships.projects_of(id).await?;
        Ok(self.repos.projects.find_many(&project_ids).await?)
    }

    /// Tasks the user owns, ordered by id
    pub async fn get_user_tasks(&self, id: UserId) -> ServiceResult<Vec<Task>> {
        require(&*self.repos.users, id).await?;

        Ok(self.repos.tasks.find_by_user(id).await?)
    }
}
