/// PostgreSQL store
///
/// Implements every repository contract on top of a `sqlx` connection pool.
/// Association sets are never stored on the entity rows; they are
/// aggregated from `tasks` and `user_projects` when a row is loaded.
///
/// Each method acquires its connection (or transaction) from the pool for
/// the duration of the call only. Connections go back to the pool when
/// dropped, and an uncommitted transaction is rolled back on drop, so every
/// exit path, `?` included, releases what it took.
///
/// # Example
///
/// ```no_run
/// use scrum_shared::db::pool::{create_pool, DatabaseConfig};
/// use scrum_shared::repo::Repositories;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// })
/// .await?;
///
/// let repos = Repositories::postgres(pool);
/// let users = repos.users.find_all().await?;
/// # Ok(())
/// # }
/// ```

use super::{
    MembershipRepository, ProjectRepository, Repository, StoreBackend, StoreError, StoreResult,
    TaskRepository, UserRepository,
};
use crate::models::ids::raw_ids;
use crate::models::{
    NewProject, NewTask, NewUser, Project, ProjectId, Role, Task, TaskId, TaskStatus, User,
    UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::collections::BTreeSet;
use tracing::debug;

const SELECT_USERS: &str = r#"
    SELECT u.id, u.username, u.email, u.password, u.role, u.created_at, u.updated_at,
           ARRAY(SELECT t.id FROM tasks t WHERE t.user_id = u.id ORDER BY t.id) AS task_ids,
           ARRAY(SELECT m.project_id FROM user_projects m WHERE m.user_id = u.id
                 ORDER BY m.project_id) AS project_ids
    FROM users u
"#;

const SELECT_PROJECTS: &str = r#"
    SELECT p.id, p.name, p.description, p.created_at, p.updated_at,
           ARRAY(SELECT m.user_id FROM user_projects m WHERE m.project_id = p.id
                 ORDER BY m.user_id) AS member_ids,
           ARRAY(SELECT t.id FROM tasks t WHERE t.project_id = p.id ORDER BY t.id) AS task_ids
    FROM projects p
"#;

const SELECT_TASKS: &str = r#"
    SELECT id, title, description, status, user_id, project_id, created_at, updated_at
    FROM tasks
"#;

#[derive(Debug, sqlx::FromRow)]
struct UserRecord {
    id: i64,
    username: String,
    email: Option<String>,
    password: Option<String>,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    task_ids: Vec<i64>,
    project_ids: Vec<i64>,
}

impl From<UserRecord> for User {
    fn from(row: UserRecord) -> Self {
        User {
            id: UserId::new(row.id),
            username: row.username,
            email: row.email,
            password: row.password,
            role: row.role,
            task_ids: row.task_ids.into_iter().map(TaskId::new).collect(),
            project_ids: row.project_ids.into_iter().map(ProjectId::new).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectRecord {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    member_ids: Vec<i64>,
    task_ids: Vec<i64>,
}

impl From<ProjectRecord> for Project {
    fn from(row: ProjectRecord) -> Self {
        Project {
            id: ProjectId::new(row.id),
            name: row.name,
            description: row.description,
            member_ids: row.member_ids.into_iter().map(UserId::new).collect(),
            task_ids: row.task_ids.into_iter().map(TaskId::new).collect(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaskRecord {
    id: i64,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    user_id: Option<i64>,
    project_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRecord> for Task {
    fn from(row: TaskRecord) -> Self {
        Task {
            id: TaskId::new(row.id),
            title: row.title,
            description: row.description,
            status: row.status,
            user_id: row.user_id.map(UserId::new),
            project_id: row.project_id.map(ProjectId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// PostgreSQL implementation of every repository contract
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn load_user(conn: &mut PgConnection, id: i64) -> StoreResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USERS} WHERE u.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(User::from))
}

async fn load_project(conn: &mut PgConnection, id: i64) -> StoreResult<Option<Project>> {
    let row = sqlx::query_as::<_, ProjectRecord>(&format!("{SELECT_PROJECTS} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    Ok(row.map(Project::from))
}

#[async_trait]
impl Repository<User> for PgStore {
    async fn find_all(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRecord>(&format!("{SELECT_USERS} ORDER BY u.id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn find_by_id(&self, id: UserId) -> StoreResult<Option<User>> {
        let mut conn = self.pool.acquire().await?;
        load_user(&mut conn, id.get()).await
    }

    async fn find_many(&self, ids: &[UserId]) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRecord>(&format!(
            "{SELECT_USERS} WHERE u.id = ANY($1) ORDER BY u.id"
        ))
        .bind(raw_ids(ids.iter().copied()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn exists(&self, id: UserId) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn insert(&self, draft: NewUser) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (username, email, password, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(draft.username)
        .bind(draft.email)
        .bind(draft.password)
        .bind(draft.role)
        .fetch_one(&mut *tx)
        .await?;

        if !draft.project_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_projects (user_id, project_id)
                SELECT $1, UNNEST($2::BIGINT[])
                "#,
            )
            .bind(id)
            .bind(raw_ids(draft.project_ids))
            .execute(&mut *tx)
            .await?;
        }

        let user = load_user(&mut tx, id).await?.ok_or(StoreError::NotFound)?;
        tx.commit().await?;

        debug!(user_id = id, "Inserted user row");
        Ok(user)
    }

    async fn save(&self, user: User) -> StoreResult<User> {
        self.save_with_projects(user, None).await
    }

    async fn delete_by_id(&self, id: UserId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn save_with_projects(
        &self,
        user: User,
        project_ids: Option<&BTreeSet<ProjectId>>,
    ) -> StoreResult<User> {
        let id = user.id.get();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = $2, email = $3, password = $4, role = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(user.username)
        .bind(user.email)
        .bind(user.password)
        .bind(user.role)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        if let Some(project_ids) = project_ids {
            sqlx::query("DELETE FROM user_projects WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO user_projects (user_id, project_id)
                SELECT $1, UNNEST($2::BIGINT[])
                "#,
            )
            .bind(id)
            .bind(raw_ids(project_ids.iter().copied()))
            .execute(&mut *tx)
            .await?;
        }

        let saved = load_user(&mut tx, id).await?.ok_or(StoreError::NotFound)?;
        tx.commit().await?;

        Ok(saved)
    }
}

#[async_trait]
impl Repository<Project> for PgStore {
    async fn find_all(&self) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRecord>(&format!("{SELECT_PROJECTS} ORDER BY p.id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn find_by_id(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        let mut conn = self.pool.acquire().await?;
        load_project(&mut conn, id.get()).await
    }

    async fn find_many(&self, ids: &[ProjectId]) -> StoreResult<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRecord>(&format!(
            "{SELECT_PROJECTS} WHERE p.id = ANY($1) ORDER BY p.id"
        ))
        .bind(raw_ids(ids.iter().copied()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn exists(&self, id: ProjectId) -> StoreResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM projects WHERE id = $1)")
                .bind(id.get())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn insert(&self, draft: NewProject) -> StoreResult<Project> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO projects (name, description)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(draft.name)
        .bind(draft.description)
        .fetch_one(&mut *tx)
        .await?;

        if !draft.member_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO user_projects (user_id, project_id)
                SELECT UNNEST($2::BIGINT[]), $1
                "#,
            )
            .bind(id)
            .bind(raw_ids(draft.member_ids))
            .execute(&mut *tx)
            .await?;
        }

        let project = load_project(&mut tx, id).await?.ok_or(StoreError::NotFound)?;
        tx.commit().await?;

        debug!(project_id = id, "Inserted project row");
        Ok(project)
    }

    async fn save(&self, project: Project) -> StoreResult<Project> {
        self.save_with_members(project, None).await
    }

    async fn delete_by_id(&self, id: ProjectId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProjectRepository for PgStore {
    async fn save_with_members(
        &self,
        project: Project,
        member_ids: Option<&BTreeSet<UserId>>,
    ) -> StoreResult<Project> {
        let id = project.id.get();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE projects
            SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(project.name)
        .bind(project.description)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        if let Some(member_ids) = member_ids {
            sqlx::query("DELETE FROM user_projects WHERE project_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query(
                r#"
                INSERT INTO user_projects (user_id, project_id)
                SELECT UNNEST($2::BIGINT[]), $1
                "#,
            )
            .bind(id)
            .bind(raw_ids(member_ids.iter().copied()))
            .execute(&mut *tx)
            .await?;
        }

        let saved = load_project(&mut tx, id).await?.ok_or(StoreError::NotFound)?;
        tx.commit().await?;

        Ok(saved)
    }
}

#[async_trait]
impl Repository<Task> for PgStore {
    async fn find_all(&self) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRecord>(&format!("{SELECT_TASKS} ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn find_by_id(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRecord>(&format!("{SELECT_TASKS} WHERE id = $1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Task::from))
    }

    async fn find_many(&self, ids: &[TaskId]) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRecord>(&format!(
            "{SELECT_TASKS} WHERE id = ANY($1) ORDER BY id"
        ))
        .bind(raw_ids(ids.iter().copied()))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn exists(&self, id: TaskId) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tasks WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    async fn insert(&self, draft: NewTask) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, TaskRecord>(
            r#"
            INSERT INTO tasks (title, description, status, user_id, project_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, status, user_id, project_id,
                      created_at, updated_at
            "#,
        )
        .bind(draft.title)
        .bind(draft.description)
        .bind(draft.status)
        .bind(draft.user_id.map(UserId::get))
        .bind(draft.project_id.map(ProjectId::get))
        .fetch_one(&self.pool)
        .await?;

        debug!(task_id = row.id, "Inserted task row");
        Ok(row.into())
    }

    async fn save(&self, task: Task) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, TaskRecord>(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, status = $4, user_id = $5, project_id = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING id, title, description, status, user_id, project_id,
                      created_at, updated_at
            "#,
        )
        .bind(task.id.get())
        .bind(task.title)
        .bind(task.description)
        .bind(task.status)
        .bind(task.user_id.map(UserId::get))
        .bind(task.project_id.map(ProjectId::get))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Task::from).ok_or(StoreError::NotFound)
    }

    async fn delete_by_id(&self, id: TaskId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id.get())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TaskRepository for PgStore {
    async fn find_by_user(&self, user_id: UserId) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRecord>(&format!(
            "{SELECT_TASKS} WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn find_by_project(&self, project_id: ProjectId) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRecord>(&format!(
            "{SELECT_TASKS} WHERE project_id = $1 ORDER BY id"
        ))
        .bind(project_id.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Task::from).collect())
    }
}

#[async_trait]
impl MembershipRepository for PgStore {
    async fn add(&self, user_id: UserId, project_id: ProjectId) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_projects (user_id, project_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(user_id.get())
        .bind(project_id.get())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove(&self, user_id: UserId, project_id: ProjectId) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM user_projects WHERE user_id = $1 AND project_id = $2")
                .bind(user_id.get())
                .bind(project_id.get())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn projects_of(&self, user_id: UserId) -> StoreResult<Vec<ProjectId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT project_id FROM user_projects WHERE user_id = $1 ORDER BY project_id",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(ProjectId::new).collect())
    }

    async fn members_of(&self, project_id: ProjectId) -> StoreResult<Vec<UserId>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT user_id FROM user_projects WHERE project_id = $1 ORDER BY user_id",
        )
        .bind(project_id.get())
        .fetch_all(&self.pool)
        .await?;

        Ok(ids.into_iter().map(UserId::new).collect())
    }
}

#[async_trait]
impl StoreBackend for PgStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::db::pool::health_check(&self.pool).await?;
        Ok(())
    }
}
