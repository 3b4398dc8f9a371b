/// Consistency tests for compound writes and concurrent service calls
///
/// Run against the in-memory store. Some tests swap individual repository
/// handles for stubs to show that a service call never relies on a second,
/// separately committed write.

use async_trait::async_trait;
use scrum_shared::models::{
    NewProject, NewTask, NewUser, Project, ProjectId, UpdateProject, UpdateUser, UserId,
};
use scrum_shared::repo::{
    MembershipRepository, ProjectRepository, Repositories, Repository, StoreError, StoreResult,
};
use scrum_shared::service::{ServiceError, Services};
use std::collections::BTreeSet;
use std::sync::Arc;

const ROUNDS: usize = 50;

fn unavailable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

/// Membership handle whose every call fails
struct UnavailableMemberships;

#[async_trait]
impl MembershipRepository for UnavailableMemberships {
    async fn add(&self, _: UserId, _: ProjectId) -> StoreResult<bool> {
        Err(unavailable())
    }

    async fn remove(&self, _: UserId, _: ProjectId) -> StoreResult<bool> {
        Err(unavailable())
    }

    async fn projects_of(&self, _: UserId) -> StoreResult<Vec<ProjectId>> {
        Err(unavailable())
    }

    async fn members_of(&self, _: ProjectId) -> StoreResult<Vec<UserId>> {
        Err(unavailable())
    }
}

/// Project handle that reports every project as existing
///
/// Lets a reference check pass for a project the store does not have, so
/// the write itself is the step that fails.
struct EveryProjectExists(Arc<dyn ProjectRepository>);

#[async_trait]
impl Repository<Project> for EveryProjectExists {
    async fn find_all(&self) -> StoreResult<Vec<Project>> {
        self.0.find_all().await
    }

    async fn find_by_id(&self, id: ProjectId) -> StoreResult<Option<Project>> {
        self.0.find_by_id(id).await
    }

    async fn find_many(&self, ids: &[ProjectId]) -> StoreResult<Vec<Project>> {
        self.0.find_many(ids).await
    }

    async fn exists(&self, _: ProjectId) -> StoreResult<bool> {
        Ok(true)
    }

    async fn insert(&self, draft: NewProject) -> StoreResult<Project> {
        self.0.insert(draft).await
    }

    async fn save(&self, project: Project) -> StoreResult<Project> {
        self.0.save(project).await
    }

    async fn delete_by_id(&self, id: ProjectId) -> StoreResult<bool> {
        self.0.delete_by_id(id).await
    }
}

#[async_trait]
impl ProjectRepository for EveryProjectExists {
    async fn save_with_members(
        &self,
        project: Project,
        member_ids: Option<&BTreeSet<UserId>>,
    ) -> StoreResult<Project> {
        self.0.save_with_members(project, member_ids).await
    }
}

fn rename(username: &str, project_ids: Option<BTreeSet<ProjectId>>) -> UpdateUser {
    UpdateUser {
        username: username.to_string(),
        project_ids,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_update_and_delete_user_are_single_writes() {
    let mut repos = Repositories::in_memory();
    let seed = Services::new(repos.clone());

    let apollo = seed
        .projects
        .create_project(NewProject::new("Apollo"))
        .await
        .unwrap();
    let gemini = seed
        .projects
        .create_project(NewProject::new("Gemini"))
        .await
        .unwrap();
    let mut draft = NewUser::new("john_doe");
    draft.project_ids.insert(apollo.id);
    let user = seed.users.create_user(draft).await.unwrap();
    let mut task = NewTask::new("estimate");
    task.user_id = Some(user.id);
    let task = seed.tasks.create_task(task).await.unwrap();

    repos.memberships = Arc::new(UnavailableMemberships);
    let services = Services::new(repos);

    let updated = services
        .users
        .update_user(user.id, rename("renamed", Some(BTreeSet::from([gemini.id]))))
        .await
        .unwrap();
    assert_eq!(updated.username, "renamed");
    assert_eq!(updated.project_ids, BTreeSet::from([gemini.id]));

    services.users.delete_user(user.id).await.unwrap();
    assert!(services.users.get_user_by_id(user.id).await.unwrap().is_none());

    let task = services.tasks.get_task_by_id(task.id).await.unwrap().unwrap();
    assert!(task.user_id.is_none());
    let gemini = services
        .projects
        .get_project_by_id(gemini.id)
        .await
        .unwrap()
        .unwrap();
    assert!(gemini.member_ids.is_empty());
}

#[tokio::test]
async fn test_update_project_is_a_single_write() {
    let mut repos = Repositories::in_memory();
    let seed = Services::new(repos.clone());

    let john = seed.users.create_user(NewUser::new("john")).await.unwrap();
    let jane = seed.users.create_user(NewUser::new("jane")).await.unwrap();
    let mut draft = NewProject::new("Apollo");
    draft.member_ids.insert(john.id);
    let project = seed.projects.create_project(draft).await.unwrap();

    repos.memberships = Arc::new(UnavailableMemberships);
    let services = Services::new(repos);

    let update = UpdateProject {
        name: "Artemis".to_string(),
        description: None,
        member_ids: Some(BTreeSet::from([jane.id])),
    };
    let updated = services
        .projects
        .update_project(project.id, update)
        .await
        .unwrap();
    assert_eq!(updated.name, "Artemis");
    assert_eq!(updated.member_ids, BTreeSet::from([jane.id]));

    services.projects.delete_project(project.id).await.unwrap();
    let jane = services.users.get_user_by_id(jane.id).await.unwrap().unwrap();
    assert!(jane.project_ids.is_empty());
}

#[tokio::test]
async fn test_failed_membership_replacement_keeps_user_unchanged() {
    let mut repos = Repositories::in_memory();
    let seed = Services::new(repos.clone());

    let apollo = seed
        .projects
        .create_project(NewProject::new("Apollo"))
        .await
        .unwrap();
    let mut draft = NewUser::new("john_doe");
    draft.project_ids.insert(apollo.id);
    let user = seed.users.create_user(draft).await.unwrap();

    repos.projects = Arc::new(EveryProjectExists(repos.projects.clone()));
    let services = Services::new(repos);

    let missing = BTreeSet::from([ProjectId::new(404)]);
    let err = services
        .users
        .update_user(user.id, rename("renamed", Some(missing)))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidReference { entity: "Project", .. }
    ));

    let stored = services.users.get_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.username, "john_doe");
    assert_eq!(stored.project_ids, BTreeSet::from([apollo.id]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_task_creation_racing_owner_delete_leaves_no_dangling_owner() {
    for _ in 0..ROUNDS {
        let services = Services::new(Repositories::in_memory());
        let user_id = services.users.create_user(NewUser::new("john")).await.unwrap().id;

        let creator = {
            let services = services.clone();
            tokio::spawn(async move {
                let mut draft = NewTask::new("estimate");
                draft.user_id = Some(user_id);
                services.tasks.create_task(draft).await
            })
        };
        let deleter = {
            let services = services.clone();
            tokio::spawn(async move { services.users.delete_user(user_id).await })
        };

        let created = creator.await.unwrap();
        deleter.await.unwrap().unwrap();

        match created {
            Ok(task) => {
                let stored = services.tasks.get_task_by_id(task.id).await.unwrap().unwrap();
                assert!(stored.user_id.is_none());
            }
            Err(err) => assert!(matches!(
                err,
                ServiceError::InvalidReference { entity: "User", .. }
            )),
        }

        for task in services.tasks.get_all_tasks().await.unwrap() {
            if let Some(owner) = task.user_id {
                assert!(services.users.get_user_by_id(owner).await.unwrap().is_some());
            }
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_update_racing_delete_never_resurrects_user() {
    for _ in 0..ROUNDS {
        let services = Services::new(Repositories::in_memory());
        let user_id = services.users.create_user(NewUser::new("john")).await.unwrap().id;

        let updater = {
            let services = services.clone();
            tokio::spawn(async move {
                services
                    .users
                    .update_user(user_id, rename("renamed", None))
                    .await
            })
        };
        let deleter = {
            let services = services.clone();
            tokio::spawn(async move { services.users.delete_user(user_id).await })
        };

        let updated = updater.await.unwrap();
        deleter.await.unwrap().unwrap();

        match updated {
            Ok(user) => assert_eq!(user.username, "renamed"),
            Err(err) => assert!(matches!(err, ServiceError::NotFound { entity: "User", .. })),
        }
        assert!(services.users.get_user_by_id(user_id).await.unwrap().is_none());
        assert!(services.users.get_all_users().await.unwrap().is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_member_replacement_racing_user_delete_keeps_memberships_valid() {
    for _ in 0..ROUNDS {
        let services = Services::new(Repositories::in_memory());
        let john = services.users.create_user(NewUser::new("john")).await.unwrap().id;
        let project = services
            .projects
            .create_project(NewProject::new("Apollo"))
            .await
            .unwrap()
            .id;

        let updater = {
            let services = services.clone();
            tokio::spawn(async move {
                let update = UpdateProject {
                    name: "Apollo".to_string(),
                    description: None,
                    member_ids: Some(BTreeSet::from([john])),
                };
                services.projects.update_project(project, update).await
            })
        };
        let deleter = {
            let services = services.clone();
            tokio::spawn(async move { services.users.delete_user(john).await })
        };

        let updated = updater.await.unwrap();
        deleter.await.unwrap().unwrap();

        if let Err(err) = updated {
            assert!(matches!(
                err,
                ServiceError::InvalidReference { entity: "User", .. }
            ));
        }

        let project = services
            .projects
            .get_project_by_id(project)
            .await
            .unwrap()
            .unwrap();
        assert!(project.member_ids.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_last_writer_wins() {
    let services = Services::new(Repositories::in_memory());
    let user_id = services.users.create_user(NewUser::new("john")).await.unwrap().id;

    let writers: Vec<_> = (0..8)
        .map(|i| {
            let services = services.clone();
            tokio::spawn(async move {
                services
                    .users
                    .update_user(user_id, rename(&format!("writer-{i}"), None))
                    .await
            })
        })
        .collect();

    let mut written = BTreeSet::new();
    for writer in writers {
        written.insert(writer.await.unwrap().unwrap().username);
    }

    let stored = services.users.get_user_by_id(user_id).await.unwrap().unwrap();
    assert!(written.contains(&stored.username));
    assert_eq!(stored.id, user_id);
}
