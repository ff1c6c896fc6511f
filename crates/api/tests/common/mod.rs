#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use parlor_api::auth::jwt::JwtConfig;
use parlor_api::auth::password::hash_password;
use parlor_api::config::{ServerConfig, StorageBackend};
use parlor_api::router::build_app_router;
use parlor_api::state::AppState;
use parlor_core::roles::ROLE_ADMIN;
use parlor_core::types::DbId;
use parlor_db::models::user::CreateUser;
use parlor_events::EventBus;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// A `ServerConfig` for the in-memory backend.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            expiry_days: 7,
        },
        password_min_length: 8,
        app_base_url: "http://localhost:5173".to_string(),
        reset_token_ttl_mins: 60,
        storage: StorageBackend::Memory,
    }
}

/// The production router over fresh in-memory stores.
///
/// The state is returned too so tests can reach the stores and the bus.
pub fn build_test_app() -> (Router, AppState) {
    let config = test_config();
    let state = AppState::in_memory(config.clone(), Arc::new(EventBus::default()));
    let app = build_app_router(state.clone(), &config);
    (app, state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn patch_json(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response {
    send(app, Method::PATCH, uri, token, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> Response {
    send(app, Method::DELETE, uri, token, None).await
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the parsed body.
pub async fn expect_json(response: Response, status: StatusCode) -> Value {
    let actual = response.status();
    let json = body_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {json}");
    json
}

// ---------------------------------------------------------------------------
// Account helpers
// ---------------------------------------------------------------------------

/// Register through the API and return the new user's id.
pub async fn register(app: &Router, name: &str, email: &str) -> DbId {
    let response = post_json(
        app,
        "/api/auth/register",
        None,
        json!({ "name": name, "email": email, "password": TEST_PASSWORD }),
    )
    .await;
    let json = expect_json(response, StatusCode::CREATED).await;
    json["userId"].as_str().unwrap().parse().unwrap()
}

/// The verification token the store holds for `email`.
pub async fn verification_token(state: &AppState, email: &str) -> String {
    state
        .users
        .find_by_email(email)
        .await
        .unwrap()
        .unwrap()
        .verification_token
        .unwrap()
}

pub async fn login(app: &Router, email: &str, password: &str) -> Response {
    post_json(
        app,
        "/api/auth/login",
        None,
        json!({ "email": email, "password": password }),
    )
    .await
}

/// Register, verify and log in. Returns `(user_id, token)`.
pub async fn signed_in_user(app: &Router, state: &AppState, name: &str) -> (DbId, String) {
    let email = format!("{}@example.com", name.to_lowercase());
    let user_id = register(app, name, &email).await;
    let token = verification_token(state, &email).await;
    let response = post_json(app, "/api/auth/verify-email", None, json!({ "token": token })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = expect_json(login(app, &email, TEST_PASSWORD).await, StatusCode::OK).await;
    (user_id, json["token"].as_str().unwrap().to_string())
}

/// Insert a verified admin straight into the store and log in.
pub async fn signed_in_admin(app: &Router, state: &AppState) -> (DbId, String) {
    let email = "admin@example.com";
    let user = state
        .users
        .create(&CreateUser {
            name: "Admin".into(),
            email: email.into(),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role: ROLE_ADMIN.into(),
            verification_token: None,
        })
        .await
        .unwrap();
    state.users.mark_verified(user.id).await.unwrap();

    let json = expect_json(login(app, email, TEST_PASSWORD).await, StatusCode::OK).await;
    (user.id, json["token"].as_str().unwrap().to_string())
}

/// Create a persona through the API and return its id.
pub async fn create_persona(app: &Router, token: &str, name: &str) -> DbId {
    let response = post_json(app, "/api/personas", Some(token), json!({ "name": name })).await;
    let json = expect_json(response, StatusCode::CREATED).await;
    json["id"].as_str().unwrap().parse().unwrap()
}
