//! Shared harness for HTTP-level integration tests.
//!
//! Requests go straight to the router through `tower::ServiceExt::oneshot`,
//! no TCP listener involved.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use pagetree_api::auth::jwt::{issue_token, JwtConfig};
use pagetree_api::config::ServerConfig;
use pagetree_api::engine::bulk::BulkTracker;
use pagetree_api::router::build_app_router;
use pagetree_api::state::AppState;
use pagetree_core::types::DbId;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

pub const ALICE: DbId = 1;
pub const BOB: DbId = 2;

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "test-secret-for-integration-tests".to_string(),
        },
        lock_ttl_mins: 30,
        bulk_async_threshold: 50,
    }
}

pub fn test_state(pool: PgPool) -> AppState {
    AppState {
        pool,
        config: Arc::new(test_config()),
        bulk_tracker: BulkTracker::new(),
    }
}

/// Router over `state`, with the same middleware stack as `main.rs`.
pub fn app(state: &AppState) -> Router {
    build_app_router(state.clone(), &state.config)
}

pub fn build_test_app(pool: PgPool) -> Router {
    app(&test_state(pool))
}

/// A bearer token for `user_id`.
pub fn token(user_id: DbId) -> String {
    issue_token(user_id, chrono::Duration::minutes(15), &test_config().jwt).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    actor: DbId,
    body: Option<Value>,
) -> Response<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token(actor)));
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str, actor: DbId) -> Response<Body> {
    send(app, Method::GET, uri, actor, None).await
}

pub async fn post_json(app: Router, uri: &str, actor: DbId, body: Value) -> Response<Body> {
    send(app, Method::POST, uri, actor, Some(body)).await
}

pub async fn put_json(app: Router, uri: &str, actor: DbId, body: Value) -> Response<Body> {
    send(app, Method::PUT, uri, actor, Some(body)).await
}

pub async fn delete(app: Router, uri: &str, actor: DbId) -> Response<Body> {
    send(app, Method::DELETE, uri, actor, None).await
}

/// Create a page with a hero section and a two-block body; returns its JSON.
pub async fn create_page(app: Router, slug: &str) -> Value {
    let response = post_json(
        app,
        "/api/v1/pages",
        ALICE,
        json!({
            "title": format!("Page {slug}"),
            "slug": slug,
            "page_type": "service",
            "sections": [
                { "section_key": "hero", "blocks": [
                    { "block_type": "hero", "content": { "text": "Welcome" } }
                ]},
                { "section_key": "body", "blocks": [
                    { "block_type": "text", "content": { "text": "One" } },
                    { "block_type": "text", "content": { "text": "Two" } }
                ]}
            ]
        }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::CREATED);
    body_json(response).await["data"].clone()
}

/// Take the page lock as `actor`.
pub async fn lock_page(app: Router, page_id: i64, actor: DbId) {
    let response = post_json(
        app,
        "/api/v1/locks/toggle",
        actor,
        json!({ "resource_type": "page", "resource_id": page_id }),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"]["transition"], "acquired");
}

/// Section keys of a page tree JSON, in order.
pub fn section_keys(tree: &Value) -> Vec<String> {
    tree["sections"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["section_key"].as_str().unwrap().to_string())
        .collect()
}
