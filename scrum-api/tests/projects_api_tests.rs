/// HTTP tests for the project and membership endpoints

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;

#[tokio::test]
async fn test_project_crud_scenario() {
    let ctx = TestContext::new();

    let (status, created) = ctx
        .send(
            "POST",
            "/v1/projects",
            Some(json!({ "name": "Apollo", "description": "moon" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["member_ids"], json!([]));
    assert_eq!(created["task_ids"], json!([]));

    let (status, updated) = ctx
        .send(
            "PUT",
            &format!("/v1/projects/{id}"),
            Some(json!({ "name": "Artemis" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], id);
    assert_eq!(updated["name"], "Artemis");
    assert!(updated["description"].is_null());

    let (status, _) = ctx.send("DELETE", &format!("/v1/projects/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.send("GET", &format!("/v1/projects/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_name_is_bad_request() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .send("POST", "/v1/projects", Some(json!({ "name": "" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "name");
}

#[tokio::test]
async fn test_membership_through_both_resources() {
    let ctx = TestContext::new();
    let user = ctx.create("/v1/users", json!({ "username": "john_doe" })).await;
    let project = ctx.create("/v1/projects", json!({ "name": "Apollo" })).await;

    let (status, _) = ctx
        .send("PUT", &format!("/v1/projects/{project}/members/{user}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Adding twice is harmless
    let (status, _) = ctx
        .send("PUT", &format!("/v1/projects/{project}/members/{user}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, members) = ctx
        .send("GET", &format!("/v1/projects/{project}/members"), None)
        .await;
    assert_eq!(members.as_array().unwrap().len(), 1);
    assert_eq!(members[0]["username"], "john_doe");
    assert!(members[0].get("password").is_none());

    let (_, fetched) = ctx.send("GET", &format!("/v1/users/{user}"), None).await;
    assert_eq!(fetched["projects"][0]["id"], project);

    let (status, _) = ctx
        .send("DELETE", &format!("/v1/projects/{project}/members/{user}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, fetched) = ctx.send("GET", &format!("/v1/users/{user}"), None).await;
    assert_eq!(fetched["projects"], json!([]));

    let (status, _) = ctx
        .send("DELETE", &format!("/v1/projects/{project}/members/{user}"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_member_routes_reject_unknown_ids() {
    let ctx = TestContext::new();
    let project = ctx.create("/v1/projects", json!({ "name": "Apollo" })).await;

    let (status, _) = ctx
        .send("PUT", &format!("/v1/projects/{project}/members/77"), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.send("GET", "/v1/projects/77/members", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .send("PUT", &format!("/v1/projects/{project}/members/x"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_replaces_members_when_listed() {
    let ctx = TestContext::new();
    let john = ctx.create("/v1/users", json!({ "username": "john" })).await;
    let jane = ctx.create("/v1/users", json!({ "username": "jane" })).await;
    let project = ctx
        .create("/v1/projects", json!({ "name": "Apollo", "member_ids": [john] }))
        .await;

    let (status, updated) = ctx
        .send(
            "PUT",
            &format!("/v1/projects/{project}"),
            Some(json!({ "name": "Apollo", "member_ids": [jane] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["member_ids"], json!([jane]));

    let (status, body) = ctx
        .send(
            "PUT",
            &format!("/v1/projects/{project}"),
            Some(json!({ "name": "Apollo", "member_ids": [404] })),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_reference");
}

#[tokio::test]
async fn test_delete_project_removes_its_tasks() {
    let ctx = TestContext::new();
    let project = ctx.create("/v1/projects", json!({ "name": "Apollo" })).await;
    let filed = ctx
        .create("/v1/tasks", json!({ "title": "launch", "project_id": project }))
        .await;
    let loose = ctx.create("/v1/tasks", json!({ "title": "loose" })).await;

    let (status, tasks) = ctx
        .send("GET", &format!("/v1/projects/{project}/tasks"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tasks[0]["id"], filed);

    let (_, fetched) = ctx.send("GET", &format!("/v1/projects/{project}"), None).await;
    assert_eq!(fetched["task_ids"], json!([filed]));

    let (status, _) = ctx
        .send("DELETE", &format!("/v1/projects/{project}"), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.send("GET", &format!("/v1/tasks/{filed}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = ctx.send("GET", &format!("/v1/tasks/{loose}"), None).await;
    assert_eq!(status, StatusCode::OK);
}
