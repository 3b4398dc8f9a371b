/// Integration tests for the project service and membership handling

use scrum_shared::models::{
    NewProject, NewTask, NewUser, ProjectId, UpdateProject, UserId,
};
use scrum_shared::repo::Repositories;
use scrum_shared::service::{ServiceError, Services};
use std::collections::BTreeSet;

fn services() -> Services {
    Services::new(Repositories::in_memory())
}

#[tokio::test]
async fn test_create_and_get_project() {
    let services = services();

    let mut draft = NewProject::new("Apollo");
    draft.description = Some("moon landing".to_string());
    let created = services.projects.create_project(draft).await.unwrap();

    let fetched = services
        .projects
        .get_project_by_id(created.id)
        .await
        .unwrap()
        .expect("project should exist");
    assert_eq!(fetched.name, "Apollo");
    assert_eq!(fetched.description.as_deref(), Some("moon landing"));
    assert!(fetched.member_ids.is_empty());
    assert!(fetched.task_ids.is_empty());
}

#[tokio::test]
async fn test_membership_is_visible_from_both_sides() {
    let services = services();
    let user = services.users.create_user(NewUser::new("john_doe")).await.unwrap();

    let mut draft = NewProject::new("Apollo");
    draft.member_ids.insert(user.id);
    let project = services.projects.create_project(draft).await.unwrap();

    assert!(project.member_ids.contains(&user.id));

    let user = services.users.get_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(user.project_ids, BTreeSet::from([project.id]));
}

#[tokio::test]
async fn test_create_with_unknown_member_is_invalid_reference() {
    let services = services();

    let mut draft = NewProject::new("Apollo");
    draft.member_ids.insert(UserId::new(42));

    let err = services.projects.create_project(draft).await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InvalidReference { entity: "User", .. }
    ));
    assert!(services.projects.get_all_projects().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_update_replaces_members_only_when_given() {
    let services = services();
    let john = services.users.create_user(NewUser::new("john")).await.unwrap();
    let jane = services.users.create_user(NewUser::new("jane")).await.unwrap();

    let mut draft = NewProject::new("Apollo");
    draft.member_ids.insert(john.id);
    let project = services.projects.create_project(draft).await.unwrap();

    let renamed = services
        .projects
        .update_project(
            project.id,
            UpdateProject {
                name: "Artemis".to_string(),
                description: None,
                member_ids: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Artemis");
    assert_eq!(renamed.member_ids, BTreeSet::from([john.id]));

    let replaced = services
        .projects
        .update_project(
            project.id,
            UpdateProject {
                name: "Artemis".to_string(),
                description: None,
                member_ids: Some(BTreeSet::from([jane.id])),
            },
        )
        .await
        .unwrap();
    assert_eq!(replaced.member_ids, BTreeSet::from([jane.id]));

    let john = services.users.get_user_by_id(john.id).await.unwrap().unwrap();
    assert!(john.project_ids.is_empty());
}

#[tokio::test]
async fn test_update_unknown_project_is_not_found() {
    let services = services();

    let err = services
        .projects
        .update_project(ProjectId::new(7), UpdateProject::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "Project", .. }));
}

#[tokio::test]
async fn test_delete_removes_tasks_and_memberships() {
    let services = services();
    let user = services.users.create_user(NewUser::new("john")).await.unwrap();

    let mut draft = NewProject::new("Apollo");
    draft.member_ids.insert(user.id);
    let project = services.projects.create_project(draft).await.unwrap();

    let mut filed = NewTask::new("filed");
    filed.project_id = Some(project.id);
    filed.user_id = Some(user.id);
    let filed = services.tasks.create_task(filed).await.unwrap();
    let loose = services.tasks.create_task(NewTask::new("loose")).await.unwrap();

    services.projects.delete_project(project.id).await.unwrap();

    assert!(services.projects.get_project_by_id(project.id).await.unwrap().is_none());
    assert!(services.tasks.get_task_by_id(filed.id).await.unwrap().is_none());
    assert!(services.tasks.get_task_by_id(loose.id).await.unwrap().is_some());

    let user = services.users.get_user_by_id(user.id).await.unwrap().unwrap();
    assert!(user.project_ids.is_empty());
    assert!(user.task_ids.is_empty());
}

#[tokio::test]
async fn test_delete_unknown_project_is_not_found() {
    let services = services();
    let err = services
        .projects
        .delete_project(ProjectId::new(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
}

#[tokio::test]
async fn test_add_and_remove_member() {
    let services = services();
    let user = services.users.create_user(NewUser::new("john")).await.unwrap();
    let project = services
        .projects
        .create_project(NewProject::new("Apollo"))
        .await
        .unwrap();

    assert!(services.projects.add_member(project.id, user.id).await.unwrap());
    assert!(!services.projects.add_member(project.id, user.id).await.unwrap());

    let members = services.projects.get_project_members(project.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, user.id);

    services.projects.remove_member(project.id, user.id).await.unwrap();
    assert!(services
        .projects
        .get_project_members(project.id)
        .await
        .unwrap()
        .is_empty());

    let err = services
        .projects
        .remove_member(project.id, user.id)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound { entity: "Membership", .. }
    ));
}

#[tokio::test]
async fn test_add_member_requires_both_sides() {
    let services = services();
    let user = services.users.create_user(NewUser::new("john")).await.unwrap();
    let project = services
        .projects
        .create_project(NewProject::new("Apollo"))
        .await
        .unwrap();

    let err = services
        .projects
        .add_member(ProjectId::new(99), user.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "Project", .. }));

    let err = services
        .projects
        .add_member(project.id, UserId::new(99))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "User", .. }));
}

#[tokio::test]
async fn test_project_tasks() {
    let services = services();
    let project = services
        .projects
        .create_project(NewProject::new("Apollo"))
        .await
        .unwrap();

    for title in ["design", "build"] {
        let mut task = NewTask::new(title);
        task.project_id = Some(project.id);
        services.tasks.create_task(task).await.unwrap();
    }
    services.tasks.create_task(NewTask::new("other")).await.unwrap();

    let tasks = services.projects.get_project_tasks(project.id).await.unwrap();
    let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["design", "build"]);

    let project = services.projects.get_project_by_id(project.id).await.unwrap().unwrap();
    assert_eq!(project.task_ids.len(), 2);
}
