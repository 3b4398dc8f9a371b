/// In-process store
///
/// Keeps every table in a single `RwLock`, so each repository call sees and
/// leaves a consistent snapshot. The store mirrors the relational schema:
/// identities are assigned from per-table counters starting at 1, foreign
/// keys are checked on every write and the same referential actions run on
/// delete (detach tasks from a deleted user, cascade a deleted project to
/// its tasks, drop memberships of either side).
///
/// # Example
///
/// ```
/// use scrum_shared::models::project::NewProject;
/// use scrum_shared::repo::Repositories;
///
/// # async fn example() -> Result<(), scrum_shared::repo::StoreError> {
/// let repos = Repositories::in_memory();
/// let project = repos.projects.insert(NewProject::new("Backlog")).await?;
/// assert_eq!(project.id.get(), 1);
/// # Ok(())
/// # }
/// ```

use super::{
    MembershipRepository, ProjectRepository, Repository, StoreBackend, StoreError, StoreResult,
    TaskRepository, UserRepository,
};
use crate::models::{
    NewProject, NewTask, NewUser, Project, ProjectId, Role, Task, TaskId, User, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tokio::sync::RwLock;
use tracing::debug;

/// Scalar columns of a user row
#[derive(Debug, Clone)]
struct UserRow {
    username: String,
    email: Option<String>,
    password: Option<String>,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Scalar columns of a project row
#[derive(Debug, Clone)]
struct ProjectRow {
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, UserRow>,
    projects: BTreeMap<ProjectId, ProjectRow>,
    tasks: BTreeMap<TaskId, Task>,
    memberships: BTreeSet<(UserId, ProjectId)>,
    last_user_id: i64,
    last_project_id: i64,
    last_task_id: i64,
}

impl Tables {
    fn user(&self, id: UserId) -> Option<User> {
        let row = self.users.get(&id)?;

        Some(User {
            id,
            username: row.username.clone(),
            email: row.email.clone(),
            password: row.password.clone(),
            role: row.role,
            task_ids: self
                .tasks
                .values()
                .filter(|task| task.user_id == Some(id))
                .map(|task| task.id)
                .collect(),
            project_ids: self
                .memberships
                .iter()
                .filter(|(user_id, _)| *user_id == id)
                .map(|(_, project_id)| *project_id)
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn project(&self, id: ProjectId) -> Option<Project> {
        let row = self.projects.get(&id)?;

        Some(Project {
            id,
            name: row.name.clone(),
            description: row.description.clone(),
            member_ids: self
                .memberships
                .iter()
                .filter(|(_, project_id)| *project_id == id)
                .map(|(user_id, _)| *user_id)
                .collect(),
            task_ids: self
                .tasks
                .values()
                .filter(|task| task.project_id == Some(id))
                .map(|task| task.id)
                .collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn check_user_refs<'a>(&self, ids: impl IntoIterator<Item = &'a UserId>) -> StoreResult<()> {
        if ids.into_iter().all(|id| self.users.contains_key(id)) {
            Ok(())
        } else {
            Err(StoreError::ForeignKey("user_projects_user_id_fkey".to_string()))
        }
    }

    fn check_project_refs<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a ProjectId>,
    ) -> StoreResult<()> {
        if ids.into_iter().all(|id| self.projects.contains_key(id)) {
            Ok(())
        } else {
            Err(StoreError::ForeignKey(
                "user_projects_project_id_fkey".to_string(),
            ))
        }
    }

    fn check_task_refs(&self, user_id: Option<UserId>, project_id: Option<ProjectId>) -> StoreResult<()> {
        if let Some(user_id) = user_id {
            if !self.users.contains_key(&user_id) {
                return Err(StoreError::ForeignKey("tasks_user_id_fkey".to_string()));
            }
        }
        if let Some(project_id) = project_id {
            if !self.projects.contains_key(&project_id) {
                return Err(StoreError::ForeignKey("tasks_project_id_fkey".to_string()));
            }
        }
        Ok(())
    }
}

/// In-process implementation of every repository contract
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository<User> for MemoryStore {
    async fn find_all(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.keys().filter_map(|id| tables.user(*id)).collect())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.user(id))
    }

    async fn find_many(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        let wanted: BTreeSet<UserId> = ids.iter().copied().collect();
        Ok(wanted.into_iter().filter_map(|id| tables.user(id)).collect())
    }

    async fn exists(&self, id: UserId) -> StoreResult<bool> {
        Ok(self.tables.read().await.users.contains_key(&id))
    }

    async fn insert(&self, draft: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        tables.check_project_refs(&draft.project_ids)?;

        tables.last_user_id += 1;
        let id = UserId::new(tables.last_user_id);
        let now = Utc::now();

        tables.users.insert(
            id,
            UserRow {
                username: draft.username,
                email: draft.email,
                password: draft.password,
                role: draft.role,
                created_at: now,
                updated_at: now,
            },
        );
        for project_id in draft.project_ids {
            tables.memberships.insert((id, project_id));
        }

        debug!(user_id = %id, "Inserted user row");
        tables.user(id).ok_or(StoreError::NotFound)
    }

    async fn save(&self, user: User) -> StoreResult<User> {
        self.save_with_projects(user, None).await
    }

    async fn delete_by_id(&self, id: UserId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }

        // ON DELETE SET NULL for tasks, CASCADE for memberships
        let now = Utc::now();
        for task in tables.tasks.values_mut().filter(|t| t.user_id == Some(id)) {
            task.user_id = None;
            task.updated_at = now;
        }
        tables.memberships.retain(|(user_id, _)| *user_id != id);

        Ok(true)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn save_with_projects(
        &self,
        user: User,
        project_ids: Option<&BTreeSet<ProjectId>>,
    ) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if let Some(project_ids) = project_ids {
            tables.check_project_refs(project_ids)?;
        }

        // Every check passed; nothing below can fail halfway
        if let Some(row) = tables.users.get_mut(&user.id) {
            row.username = user.username;
            row.email = user.email;
            row.password = user.password;
            row.role = user.role;
            row.updated_at = Utc::now();
        }
        if let Some(project_ids) = project_ids {
            tables.memberships.retain(|(member, _)| *member != user.id);
            for project_id in project_ids {
                tables.memberships.insert((user.id, *project_id));
            }
        }

        tables.user(user.id).ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl Repository<Project> for MemoryStore {
    async fn find_all(&self) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .keys()
            .filter_map(|id| tables.project(*id))
            .collect())
    }

    async fn find_by_id(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.tables.read().await.project(id))
    }

    async fn find_many(&self, ids: &[ProjectId]) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        let wanted: BTreeSet<ProjectId> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| tables.project(id))
            .collect())
    }

    async fn exists(&self, id: ProjectId) -> StoreResult<bool> {
        Ok(self.tables.read().await.projects.contains_key(&id))
    }

    async fn insert(&self, draft: NewProject) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        tables.check_user_refs(&draft.member_ids)?;

        tables.last_project_id += 1;
        let id = ProjectId::new(tables.last_project_id);
        let now = Utc::now();

        tables.projects.insert(
            id,
            ProjectRow {
                name: draft.name,
                description: draft.description,
                created_at: now,
                updated_at: now,
            },
        );
        for user_id in draft.member_ids {
            tables.memberships.insert((user_id, id));
        }

        debug!(project_id = %id, "Inserted project row");
        tables.project(id).ok_or(StoreError::NotFound)
    }

    async fn save(&self, project: Project) -> StoreResult<Project> {
        self.save_with_members(project, None).await
    }

    async fn delete_by_id(&self, id: ProjectId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.projects.remove(&id).is_none() {
            return Ok(false);
        }

        // ON DELETE CASCADE for tasks and memberships
        tables.tasks.retain(|_, task| task.project_id != Some(id));
        tables.memberships.retain(|(_, project_id)| *project_id != id);

        Ok(true)
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn save_with_members(
        &self,
        project: Project,
        member_ids: Option<&BTreeSet<UserId>>,
    ) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        if !tables.projects.contains_key(&project.id) {
            return Err(StoreError::NotFound);
        }
        if let Some(member_ids) = member_ids {
            tables.check_user_refs(member_ids)?;
        }

        if let Some(row) = tables.projects.get_mut(&project.id) {
            row.name = project.name;
            row.description = project.description;
            row.updated_at = Utc::now();
        }
        if let Some(member_ids) = member_ids {
            tables.memberships.retain(|(_, id)| *id != project.id);
            for user_id in member_ids {
                tables.memberships.insert((*user_id, project.id));
            }
        }

        tables.project(project.id).ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl Repository<Task> for MemoryStore {
    async fn find_all(&self) -> StoreResult<Vec<Task>> {
        Ok(self.tables.read().await.tasks.values().cloned().collect())
    }

    async fn find_by_id(&self, id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[TaskId]) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        let wanted: BTreeSet<TaskId> = ids.iter().copied().collect();
        Ok(wanted
            .into_iter()
            .filter_map(|id| tables.tasks.get(&id).cloned())
            .collect())
    }

    async fn exists(&self, id: TaskId) -> StoreResult<bool> {
        Ok(self.tables.read().await.tasks.contains_key(&id))
    }

    async fn insert(&self, draft: NewTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        tables.check_task_refs(draft.user_id, draft.project_id)?;

        tables.last_task_id += 1;
        let id = TaskId::new(tables.last_task_id);
        let now = Utc::now();

        let task = Task {
            id,
            title: draft.title,
            description: draft.description,
            status: draft.status,
            user_id: draft.user_id,
            project_id: draft.project_id,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(id, task.clone());

        debug!(task_id = %id, "Inserted task row");
        Ok(task)
    }

    async fn save(&self, task: Task) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        tables.check_task_refs(task.user_id, task.project_id)?;

        let stored = tables.tasks.get_mut(&task.id).ok_or(StoreError::NotFound)?;
        stored.title = task.title;
        stored.description = task.description;
        stored.status = task.status;
        stored.user_id = task.user_id;
        stored.project_id = task.project_id;
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn delete_by_id(&self, id: TaskId) -> StoreResult<bool> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .values()
            .filter(|task| task.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn find_by_project(&self, project_id: ProjectId) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .values()
            .filter(|task| task.project_id == Some(project_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MembershipRepository for MemoryStore {
    async fn add(&self, user_id: UserId, project_id: ProjectId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        tables.check_user_refs([&user_id])?;
        tables.check_project_refs([&project_id])?;

        Ok(tables.memberships.insert((user_id, project_id)))
    }

    async fn remove(&self, user_id: UserId, project_id: ProjectId) -> StoreResult<bool> {
        Ok(self
            .tables
            .write()
            .await
            .memberships
            .remove(&(user_id, project_id)))
    }

    async fn projects_of(&self, user_id: UserId) -> StoreResult<Vec<ProjectId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|(member, _)| *member == user_id)
            .map(|(_, project_id)| *project_id)
            .collect())
    }

    async fn members_of(&self, project_id: ProjectId) -> StoreResult<Vec<UserId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|(_, project)| *project == project_id)
            .map(|(user_id, _)| *user_id)
            .collect())
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
