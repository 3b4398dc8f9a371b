/// Project service
///
/// CRUD over projects plus membership management. Membership is a single
/// relation, so adding a member here is immediately visible in the user's
/// `project_ids` and vice versa.

use super::{check_references, require, vanished, ServiceError, ServiceResult};
use crate::models::{NewProject, Project, ProjectId, Task, UpdateProject, User, UserId};
use crate::repo::Repositories;
use tracing::info;

#[derive(Clone)]
pub struct ProjectService {
    repos: Repositories,
}

impl ProjectService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Creates a project with an optional initial member set
    ///
    /// # Errors
    ///
    /// - `InvalidReference` if a listed member does not exist
    pub async fn create_project(&self, data: NewProject) -> ServiceResult<Project> {
        check_references(&*self.repos.users, data.member_ids.iter().copied()).await?;

        let project = self.repos.projects.insert(data).await?;

        info!(project_id = %project.id, name = %project.name, "Project created");
        Ok(project)
    }

    pub async fn get_all_projects(&self) -> ServiceResult<Vec<Project>> {
        Ok(self.repos.projects.find_all().await?)
    }

    /// Projects whose ids are listed, ordered by id; unknown ids are skipped
    pub async fn get_projects_by_ids(&self, ids: &[ProjectId]) -> ServiceResult<Vec<Project>> {
        Ok(self.repos.projects.find_many(ids).await?)
    }

    pub async fn get_project_by_id(&self, id: ProjectId) -> ServiceResult<Option<Project>> {
        Ok(self.repos.projects.find_by_id(id).await?)
    }

    /// Overwrites name and description, and the member set when given
    ///
    /// # Errors
    ///
    /// - `NotFound` if the project does not exist (nothing is written)
    /// - `InvalidReference` if a listed member does not exist
    pub async fn update_project(
        &self,
        id: ProjectId,
        data: UpdateProject,
    ) -> ServiceResult<Project> {
        let mut project = self
            .repos
            .projects
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project", id))?;

        if let Some(member_ids) = &data.member_ids {
            check_references(&*self.repos.users, member_ids.iter().copied()).await?;
        }

        project.name = data.name;
        project.description = data.description;

        let project = self
            .repos
            .projects
            .save_with_members(project, data.member_ids.as_ref())
            .await
            .map_err(vanished::<Project>(id))?;

        info!(project_id = %id, "Project updated");
        Ok(project)
    }

    /// Deletes a project together with its tasks and memberships
    ///
    /// # Errors
    ///
    /// - `NotFound` if the project does not exist (nothing is written)
    pub async fn delete_project(&self, id: ProjectId) -> ServiceResult<()> {
        if !self.repos.projects.delete_by_id(id).await? {
            return Err(ServiceError::not_found("Project", id));
        }

        info!(project_id = %id, "Project deleted");
        Ok(())
    }

    /// Adds a user to a project
    ///
    /// Returns false if the user already was a member.
    ///
    /// # Errors
    ///
    /// - `NotFound` if either the project or the user does not exist
    pub async fn add_member(&self, project_id: ProjectId, user_id: UserId) -> ServiceResult<bool> {
        require(&*self.repos.projects, project_id).await?;
        require(&*self.repos.users, user_id).await?;

        let added = self.repos.memberships.add(user_id, project_id).await?;
        if added {
            info!(project_id = %project_id, user_id = %user_id, "Member added");
        }
        Ok(added)
    }

    /// Removes a user from a project
    ///
    /// # Errors
    ///
    /// - `NotFound` if the project or the user does not exist, or the user
    ///   is not a member
    pub async fn remove_member(&self, project_id: ProjectId, user_id: UserId) -> ServiceResult<()> {
        require(&*self.repos.projects, project_id).await?;
        require(&*self.repos.users, user_id).await?;

        if !self.repos.memberships.remove(user_id, project_id).await? {
            return Err(ServiceError::not_found(
                "Membership",
                format!("{project_id}/{user_id}"),
            ));
        }

        info!(project_id = %project_id, user_id = %user_id, "Member removed");
        Ok(())
    }

    /// Members of a project, ordered by id
    pub async fn get_project_members(&self, id: ProjectId) -> ServiceResult<Vec<User>> {
        require(&*self.repos.projects, id).await?;

        let member_ids = self.repos.memberships.members_of(id).await?;
        Ok(self.repos.users.find_many(&member_ids).await?)
    }

    /// Tasks filed under a project, ordered by id
    pub async fn get_project_tasks(&self, id: ProjectId) -> ServiceResult<Vec<Task>> {
        require(&*self.repos.projects, id).await?;

        Ok(self.repos.tasks.find_by_project(id).await?)
    }
}
