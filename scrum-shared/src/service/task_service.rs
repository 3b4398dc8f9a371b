/// Task service
///
/// Tasks are the owning side of the user/task relation. Every write checks
/// that the owning user and the project, when set, exist before anything is
/// persisted.

use super::{check_references, vanished, ServiceError, ServiceResult};
use crate::models::{NewTask, ProjectId, Task, TaskId, UpdateTask, UserId};
use crate::repo::Repositories;
use tracing::info;

#[derive(Clone)]
pub struct TaskService {
    repos: Repositories,
}

impl TaskService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    async fn check_task_references(
        &self,
        user_id: Option<UserId>,
        project_id: Option<ProjectId>,
    ) -> ServiceResult<()> {
        check_references(&*self.repos.users, user_id).await?;
        check_references(&*self.repos.projects, project_id).await
    }

    /// Creates a task
    ///
    /// # Errors
    ///
    /// - `InvalidReference` if `user_id` or `project_id` is set and does not
    ///   exist (nothing is written)
    pub async fn create_task(&self, data: NewTask) -> ServiceResult<Task> {
        self.check_task_references(data.user_id, data.project_id)
            .await?;

        let task = self.repos.tasks.insert(data).await?;

        info!(
            task_id = %task.id,
            user_id = ?task.user_id.map(UserId::get),
            project_id = ?task.project_id.map(ProjectId::get),
            "Task created"
        );
        Ok(task)
    }

    pub async fn get_all_tasks(&self) -> ServiceResult<Vec<Task>> {
        Ok(self.repos.tasks.find_all().await?)
    }

    pub async fn get_task_by_id(&self, id: TaskId) -> ServiceResult<Option<Task>> {
        Ok(self.repos.tasks.find_by_id(id).await?)
    }

    /// Overwrites title, description and status
    ///
    /// References are replaced or cleared only when the update carries
    /// them; an absent reference keeps the stored one.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the task does not exist (checked first)
    /// - `InvalidReference` if the resulting `user_id` or `project_id` does
    ///   not exist
    pub async fn update_task(&self, id: TaskId, data: UpdateTask) -> ServiceResult<Task> {
        let mut task = self
            .repos
            .tasks
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Task", id))?;

        let user_id = data.owner_after(task.user_id);
        let project_id = data.project_after(task.project_id);
        self.check_task_references(user_id, project_id).await?;

        task.title = data.title;
        task.description = data.description;
        task.status = data.status;
        task.user_id = user_id;
        task.project_id = project_id;

        let task = self
            .repos
            .tasks
            .save(task)
            .await
            .map_err(vanished::<Task>(id))?;

        info!(task_id = %id, status = task.status.as_str(), "Task updated");
        Ok(task)
    }

    /// # Errors
    ///
    /// - `NotFound` if the task does not exist
    pub async fn delete_task(&self, id: TaskId) -> ServiceResult<()> {
        if !self.repos.tasks.delete_by_id(id).await? {
            return Err(ServiceError::not_found("Task", id));
        }

        info!(task_id = %id, "Task deleted");
        Ok(())
    }
}
