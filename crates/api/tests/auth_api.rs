//! HTTP-level tests for registration, verification, login, password reset
//! and the `/auth/me` profile endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, expect_json, get, login, patch_json, post_json, register, send,
    verification_token, TEST_JWT_SECRET, TEST_PASSWORD,
};
use parlor_api::auth::jwt::{validate_token, JwtConfig};
use parlor_events::event_types;
use serde_json::json;

#[tokio::test]
async fn register_verify_login_flow() {
    let (app, state) = common::build_test_app();

    let user_id = register(&app, "Ada", "Ada@Example.com").await;

    let response = login(&app, "ada@example.com", TEST_PASSWORD).await;
    let json = expect_json(response, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "Please verify your email before logging in");

    let token = verification_token(&state, "ada@example.com").await;
    let response = post_json(&app, "/api/auth/verify-email", None, json!({ "token": token })).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = login(&app, "ada@example.com", TEST_PASSWORD).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["user"]["email"], "ada@example.com");
    assert_eq!(json["user"]["is_verified"], true);
    assert!(json["user"].get("password_hash").is_none());

    let claims = validate_token(
        json["token"].as_str().unwrap(),
        &JwtConfig {
            secret: TEST_JWT_SECRET.into(),
            expiry_days: 7,
        },
    )
    .unwrap();
    assert_eq!(claims.id, user_id);
    assert_eq!(claims.email, "ada@example.com");
    assert_eq!(claims.role, "user");
}

#[tokio::test]
async fn wrong_password_is_rejected_before_verification_state() {
    let (app, _state) = common::build_test_app();
    register(&app, "Bob", "bob@example.com").await;

    let json = expect_json(
        login(&app, "bob@example.com", "not-the-password").await,
        StatusCode::UNAUTHORIZED,
    )
    .await;
    assert_eq!(json["message"], "Invalid email or password");

    let json = expect_json(
        login(&app, "nobody@example.com", TEST_PASSWORD).await,
        StatusCode::UNAUTHORIZED,
    )
    .await;
    assert_eq!(json["message"], "Invalid email or password");
}

#[tokio::test]
async fn registration_publishes_event_with_verification_token() {
    let (app, state) = common::build_test_app();
    let mut events = state.event_bus.subscribe();

    register(&app, "Cleo", "cleo@example.com").await;

    let event = events.recv().await.unwrap();
    assert_eq!(event.event_type, event_types::USER_REGISTERED);
    assert_eq!(event.payload_str("email"), Some("cleo@example.com"));
    let stored = verification_token(&state, "cleo@example.com").await;
    assert_eq!(event.payload_str("verification_token"), Some(stored.as_str()));
}

#[tokio::test]
async fn duplicate_email_is_a_conflict() {
    let (app, _state) = common::build_test_app();
    register(&app, "Dana", "dana@example.com").await;

    let response = post_json(
        &app,
        "/api/auth/register",
        None,
        json!({ "name": "Dana 2", "email": "DANA@example.com", "password": TEST_PASSWORD }),
    )
    .await;
    let json = expect_json(response, StatusCode::CONFLICT).await;
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn short_password_is_a_validation_error() {
    let (app, _state) = common::build_test_app();
    let response = post_json(
        &app,
        "/api/auth/register",
        None,
        json!({ "name": "Eve", "email": "eve@example.com", "password": "short" }),
    )
    .await;
    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn bad_verification_token_is_rejected() {
    let (app, _state) = common::build_test_app();
    let response = post_json(
        &app,
        "/api/auth/verify-email",
        None,
        json!({ "token": "does-not-exist" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn password_reset_flow() {
    let (app, state) = common::build_test_app();
    let (_id, _token) = common::signed_in_user(&app, &state, "Finn").await;
    let mut events = state.event_bus.subscribe();

    let response = post_json(
        &app,
        "/api/auth/forgot-password",
        None,
        json!({ "email": "finn@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let event = events.recv().await.unwrap();
    assert_eq!(event.event_type, event_types::PASSWORD_RESET_REQUESTED);
    let reset_token = event.payload_str("reset_token").unwrap().to_string();

    let response = post_json(
        &app,
        "/api/auth/reset-password",
        None,
        json!({ "token": reset_token, "password": "a-brand-new-password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(
        login(&app, "finn@example.com", TEST_PASSWORD).await.status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        login(&app, "finn@example.com", "a-brand-new-password")
            .await
            .status(),
        StatusCode::OK
    );

    // The token is single-use.
    let response = post_json(
        &app,
        "/api/auth/reset-password",
        None,
        json!({ "token": reset_token, "password": "yet-another-password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn forgot_password_for_unknown_email_still_succeeds() {
    let (app, _state) = common::build_test_app();
    let response = post_json(
        &app,
        "/api/auth/forgot-password",
        None,
        json!({ "email": "ghost@example.com" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["message"].is_string());
}

#[tokio::test]
async fn me_requires_a_token() {
    let (app, _state) = common::build_test_app();

    let json = expect_json(get(&app, "/api/auth/me", None).await, StatusCode::UNAUTHORIZED).await;
    assert_eq!(json["code"], "UNAUTHORIZED");

    let response = get(&app, "/api/auth/me", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn me_get_update_and_delete() {
    let (app, state) = common::build_test_app();
    let (user_id, token) = common::signed_in_user(&app, &state, "Gus").await;

    let json = expect_json(get(&app, "/api/auth/me", Some(&token)).await, StatusCode::OK).await;
    assert_eq!(json["user"]["id"], user_id.to_string());
    assert_eq!(json["user"]["usage_count"], 0);

    let response =
        patch_json(&app, "/api/auth/me", Some(&token), json!({ "name": "Gustav" })).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["user"]["name"], "Gustav");

    let response = send(
        &app,
        axum::http::Method::DELETE,
        "/api/auth/me",
        Some(&token),
        Some(json!({ "password": "wrong-password" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        axum::http::Method::DELETE,
        "/api/auth/me",
        Some(&token),
        Some(json!({ "password": TEST_PASSWORD })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(state.users.find_by_id(user_id).await.unwrap().is_none());
    let response = get(&app, "/api/auth/me", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
