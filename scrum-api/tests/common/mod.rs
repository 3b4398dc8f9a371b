//! Common test utilities for integration tests
//!
//! Every context gets its own in-memory store, so tests are isolated and
//! need no database.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use scrum_api::app::{build_router, AppState};
use scrum_api::config::Config;
use scrum_shared::repo::Repositories;
use serde_json::Value;
use tower::Service as _;

/// Test context containing the router under test
pub struct TestContext {
    pub app: axum::Router,
}

impl TestContext {
    pub fn new() -> Self {
        let state = AppState::new(Repositories::in_memory(), Config::in_memory());
        TestContext {
            app: build_router(state),
        }
    }

    /// Sends a request, returning the status and the parsed JSON body
    ///
    /// An empty body comes back as `Value::Null`.
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.call(request).await
    }

    /// Sends a prepared request
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("response is not JSON: {}", String::from_utf8_lossy(&bytes))
            })
        };

        (status, json)
    }

    /// Creates an entity and returns its id
    pub async fn create(&self, uri: &str, body: Value) -> i64 {
        let (status, json) = self.send("POST", uri, Some(body)).await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {json}");
        json["id"].as_i64().expect("created entity has an id")
    }
}
