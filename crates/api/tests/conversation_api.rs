//! HTTP-level tests for personas, conversations and messages.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_persona, delete, expect_json, get, patch_json, post_json, send,
    signed_in_admin, signed_in_user,
};
use parlor_core::types::DbId;
use serde_json::{json, Value};

async fn create_conversation(
    app: &axum::Router,
    token: &str,
    body: Value,
) -> (StatusCode, Value) {
    let response = post_json(app, "/api/conversations", Some(token), body).await;
    let status = response.status();
    (status, body_json(response).await)
}

fn id_of(json: &Value) -> DbId {
    json["id"].as_str().unwrap().parse().unwrap()
}

// ---------------------------------------------------------------------------
// Personas
// ---------------------------------------------------------------------------

#[tokio::test]
async fn personas_are_private_to_their_owner() {
    let (app, state) = common::build_test_app();
    let (alice_id, alice) = signed_in_user(&app, &state, "Alice").await;
    let (_bob_id, bob) = signed_in_user(&app, &state, "Bob").await;

    let persona = create_persona(&app, &alice, "Amy").await;

    let json = expect_json(
        get(&app, &format!("/api/personas/{persona}"), Some(&alice)).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["owner_id"], alice_id.to_string());
    assert_eq!(json["is_ai_agent"], false);

    let response = get(&app, &format!("/api/personas/{persona}"), Some(&bob)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let json = expect_json(get(&app, "/api/personas", Some(&bob)).await, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 0);

    let response = patch_json(
        &app,
        &format!("/api/personas/{persona}"),
        Some(&alice),
        json!({ "description": "Curious" }),
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["description"], "Curious");
    assert_eq!(json["name"], "Amy");
}

#[tokio::test]
async fn only_admins_set_ai_config() {
    let (app, state) = common::build_test_app();
    let (_alice_id, alice) = signed_in_user(&app, &state, "Alice").await;
    let (_admin_id, admin) = signed_in_admin(&app, &state).await;
    let persona = create_persona(&app, &alice, "Clara").await;
    let uri = format!("/api/personas/{persona}/ai-config");
    let body = json!({ "is_ai_agent": true, "ai_config": { "can_moderate_content": true } });

    let response = send(
        &app,
        axum::http::Method::PUT,
        &uri,
        Some(&alice),
        Some(body.clone()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, axum::http::Method::PUT, &uri, Some(&admin), Some(body)).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["is_ai_agent"], true);
    assert_eq!(json["ai_config"]["can_moderate_content"], true);
    assert_eq!(json["ai_config"]["can_add_participants"], false);

    // Admins list every persona.
    let json = expect_json(get(&app, "/api/personas", Some(&admin)).await, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Conversations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_with_initial_message() {
    let (app, state) = common::build_test_app();
    let (alice_id, alice) = signed_in_user(&app, &state, "Alice").await;
    let host = create_persona(&app, &alice, "Amy").await;

    let (status, json) = create_conversation(
        &app,
        &alice,
        json!({
            "title": "Tea time",
            "participants": [{ "persona_id": host, "role": "host" }],
            "metadata": { "tags": ["casual"] },
            "initial_message": { "persona_id": host, "content": "Hello!" },
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert_eq!(json["created_by"], alice_id.to_string());
    assert_eq!(json["state"]["status"], "active");
    assert_eq!(json["history"][0]["action"], "conversation_created");
    let id = id_of(&json);

    let json = expect_json(
        get(&app, &format!("/api/conversations/{id}/messages"), Some(&alice)).await,
        StatusCode::OK,
    )
    .await;
    let messages = json["data"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["content"], "Hello!");
    assert_eq!(messages[0]["persona_id"], host.to_string());

    let me = state.users.find_by_id(alice_id).await.unwrap().unwrap();
    assert_eq!(me.usage_count, 1);
}

#[tokio::test]
async fn create_requires_a_title() {
    let (app, state) = common::build_test_app();
    let (_id, alice) = signed_in_user(&app, &state, "Alice").await;

    let (status, json) = create_conversation(&app, &alice, json!({ "title": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["errors"][0]["field"], "title");
}

#[tokio::test]
async fn blank_titles_are_rejected() {
    let (app, state) = common::build_test_app();
    let (_id, alice) = signed_in_user(&app, &state, "Alice").await;

    let (status, json) = create_conversation(&app, &alice, json!({ "title": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{json}");
    assert_eq!(json["code"], "VALIDATION_ERROR");
    assert_eq!(json["errors"][0]["field"], "title");
    assert_eq!(json["errors"][0]["message"], "Title is required");

    let (_, json) = create_conversation(&app, &alice, json!({ "title": "  Salon  " })).await;
    assert_eq!(json["title"], "Salon");
    let uri = format!("/api/conversations/{}", id_of(&json));

    let response = patch_json(&app, &uri, Some(&alice), json!({ "title": " " })).await;
    let json = expect_json(response, StatusCode::BAD_REQUEST).await;
    assert_eq!(json["code"], "VALIDATION_ERROR");

    let response = patch_json(&app, &uri, Some(&alice), json!({ "title": " Parlour " })).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["title"], "Parlour");
}

#[tokio::test]
async fn cannot_host_with_someone_elses_persona() {
    let (app, state) = common::build_test_app();
    let (_a, alice) = signed_in_user(&app, &state, "Alice").await;
    let (_b, bob) = signed_in_user(&app, &state, "Bob").await;
    let alices = create_persona(&app, &alice, "Amy").await;

    let (status, json) = create_conversation(
        &app,
        &bob,
        json!({ "title": "Hijack", "participants": [{ "persona_id": alices, "role": "host" }] }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
}

#[tokio::test]
async fn inaccessible_conversation_looks_missing() {
    let (app, state) = common::build_test_app();
    let (_a, alice) = signed_in_user(&app, &state, "Alice").await;
    let (_b, bob) = signed_in_user(&app, &state, "Bob").await;
    let (_admin_id, admin) = signed_in_admin(&app, &state).await;

    let (_, json) = create_conversation(&app, &alice, json!({ "title": "Private" })).await;
    let id = id_of(&json);
    let uri = format!("/api/conversations/{id}");

    assert_eq!(get(&app, &uri, Some(&bob)).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(get(&app, &uri, Some(&admin)).await.status(), StatusCode::OK);

    let json = expect_json(get(&app, "/api/conversations", Some(&bob)).await, StatusCode::OK).await;
    assert!(json["data"].as_array().unwrap().is_empty());

    // Writes say why.
    let response = patch_json(&app, &uri, Some(&bob), json!({ "title": "Mine now" })).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_pages_only_count_readable_conversations() {
    let (app, state) = common::build_test_app();
    let (_a, alice) = signed_in_user(&app, &state, "Alice").await;
    let (_b, bob) = signed_in_user(&app, &state, "Bob").await;
    let (_c, carol) = signed_in_user(&app, &state, "Carol").await;
    let (_admin_id, admin) = signed_in_admin(&app, &state).await;
    let carols = create_persona(&app, &carol, "Cleo").await;

    let (_, own) = create_conversation(&app, &alice, json!({ "title": "Mine" })).await;
    let (_, guest) = create_conversation(
        &app,
        &bob,
        json!({
            "title": "With Cleo",
            "participants": [{ "persona_id": carols, "role": "guest" }],
        }),
    )
    .await;
    for i in 0..25 {
        let (status, _) =
            create_conversation(&app, &bob, json!({ "title": format!("Bob {i}") })).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let response = get(&app, "/api/conversations", Some(&alice)).await;
    let json = expect_json(response, StatusCode::OK).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], own["id"]);

    let response = get(&app, "/api/conversations", Some(&carol)).await;
    let json = expect_json(response, StatusCode::OK).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], guest["id"]);

    let response = get(&app, "/api/conversations", Some(&admin)).await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 20);
}

#[tokio::test]
async fn participant_query_then_removal_blocks_messages() {
    let (app, state) = common::build_test_app();
    let (_a, alice) = signed_in_user(&app, &state, "Alice").await;
    let p1 = create_persona(&app, &alice, "P1").await;

    let (_, json) = create_conversation(
        &app,
        &alice,
        json!({ "title": "Lobby", "participants": [{ "persona_id": p1, "role": "host" }] }),
    )
    .await;
    let id = id_of(&json);

    let json = expect_json(
        get(
            &app,
            &format!("/api/conversations?participant_persona_id={p1}"),
            Some(&alice),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    let found = json["data"].as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], id.to_string());

    let response = delete(
        &app,
        &format!("/api/conversations/{id}/participants/{p1}"),
        Some(&alice),
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;
    assert!(json["participants"].as_array().unwrap().is_empty());

    let response = post_json(
        &app,
        &format!("/api/conversations/{id}/messages"),
        Some(&alice),
        json!({ "persona_id": p1, "content": "Still here?" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn add_participant_is_idempotent_over_http() {
    let (app, state) = common::build_test_app();
    let (_a, alice) = signed_in_user(&app, &state, "Alice").await;
    let host = create_persona(&app, &alice, "Host").await;
    let guest = create_persona(&app, &alice, "Guest").await;

    let (_, json) = create_conversation(
        &app,
        &alice,
        json!({ "title": "Salon", "participants": [{ "persona_id": host, "role": "host" }] }),
    )
    .await;
    let uri = format!("/api/conversations/{}/participants", id_of(&json));

    let first = expect_json(
        post_json(&app, &uri, Some(&alice), json!({ "persona_id": guest })).await,
        StatusCode::OK,
    )
    .await;
    let second = expect_json(
        post_json(&app, &uri, Some(&alice), json!({ "persona_id": guest })).await,
        StatusCode::OK,
    )
    .await;

    assert_eq!(first["participants"].as_array().unwrap().len(), 2);
    assert_eq!(second["participants"], first["participants"]);
    assert_eq!(second["history"], first["history"]);
    assert_eq!(first["participants"][1]["role"], "guest");
}

#[tokio::test]
async fn lifecycle_pause_resume_close() {
    let (app, state) = common::build_test_app();
    let (alice_id, alice) = signed_in_user(&app, &state, "Alice").await;
    let host = create_persona(&app, &alice, "Host").await;

    let (_, json) = create_conversation(
        &app,
        &alice,
        json!({ "title": "Debate", "participants": [{ "persona_id": host, "role": "host" }] }),
    )
    .await;
    let id = id_of(&json);
    let message_uri = format!("/api/conversations/{id}/messages");
    let message = json!({ "persona_id": host, "content": "Point one" });

    let json = expect_json(
        post_json(&app, &format!("/api/conversations/{id}/pause"), Some(&alice), json!({})).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["state"]["status"], "paused");
    assert_eq!(
        post_json(&app, &message_uri, Some(&alice), message.clone())
            .await
            .status(),
        StatusCode::FORBIDDEN
    );

    let json = expect_json(
        post_json(&app, &format!("/api/conversations/{id}/resume"), Some(&alice), json!({})).await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["state"]["status"], "active");
    assert_eq!(
        post_json(&app, &message_uri, Some(&alice), message.clone())
            .await
            .status(),
        StatusCode::CREATED
    );

    let json = expect_json(
        post_json(
            &app,
            &format!("/api/conversations/{id}/close"),
            Some(&alice),
            json!({ "reason": "Time is up" }),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    assert_eq!(json["state"]["status"], "closed");
    assert_eq!(json["state"]["can_add_messages"], false);
    assert_eq!(json["state"]["closed_by"], alice_id.to_string());
    assert_eq!(json["state"]["close_reason"], "Time is up");

    let response = post_json(
        &app,
        &format!("/api/conversations/{id}/resume"),
        Some(&alice),
        json!({}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        post_json(&app, &message_uri, Some(&alice), message)
            .await
            .status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn close_without_body() {
    let (app, state) = common::build_test_app();
    let (_a, alice) = signed_in_user(&app, &state, "Alice").await;
    let (_, json) = create_conversation(&app, &alice, json!({ "title": "Quick" })).await;
    let id = id_of(&json);

    let response = send(
        &app,
        axum::http::Method::POST,
        &format!("/api/conversations/{id}/close"),
        Some(&alice),
        None,
    )
    .await;
    let json = expect_json(response, StatusCode::OK).await;
    assert_eq!(json["state"]["status"], "closed");
    assert!(json["state"]["close_reason"].is_null());
}

#[tokio::test]
async fn guest_owner_can_leave_and_read() {
    let (app, state) = common::build_test_app();
    let (_a, alice) = signed_in_user(&app, &state, "Alice").await;
    let (_b, bob) = signed_in_user(&app, &state, "Bob").await;
    let host = create_persona(&app, &alice, "Host").await;
    let bobs = create_persona(&app, &bob, "Bobby").await;

    let (_, json) = create_conversation(
        &app,
        &alice,
        json!({
            "title": "Open floor",
            "participants": [
                { "persona_id": host, "role": "host" },
                { "persona_id": bobs, "role": "guest" },
            ],
        }),
    )
    .await;
    let id = id_of(&json);

    // Bob can see it through his persona and post as it.
    assert_eq!(
        get(&app, &format!("/api/conversations/{id}"), Some(&bob)).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        post_json(
            &app,
            &format!("/api/conversations/{id}/messages"),
            Some(&bob),
            json!({ "persona_id": bobs, "content": "Hi all" }),
        )
        .await
        .status(),
        StatusCode::CREATED
    );

    // Bob cannot post as Alice's persona.
    assert_eq!(
        post_json(
            &app,
            &format!("/api/conversations/{id}/messages"),
            Some(&bob),
            json!({ "persona_id": host, "content": "I am Alice" }),
        )
        .await
        .status(),
        StatusCode::FORBIDDEN
    );

    let json = expect_json(
        post_json(
            &app,
            &format!("/api/conversations/{id}/participants/{bobs}/leave"),
            Some(&bob),
            json!({}),
        )
        .await,
        StatusCode::OK,
    )
    .await;
    let bob_entry = json["participants"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["persona_id"] == bobs.to_string())
        .unwrap()
        .clone();
    assert!(bob_entry["left_at"].is_string());

    assert_eq!(
        post_json(
            &app,
            &format!("/api/conversations/{id}/messages"),
            Some(&bob),
            json!({ "persona_id": bobs, "content": "Back again" }),
        )
        .await
        .status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn soft_deleted_conversation_disappears() {
    let (app, state) = common::build_test_app();
    let (_a, alice) = signed_in_user(&app, &state, "Alice").await;
    let (_b, bob) = signed_in_user(&app, &state, "Bob").await;
    let (_, json) = create_conversation(&app, &alice, json!({ "title": "Ephemeral" })).await;
    let uri = format!("/api/conversations/{}", id_of(&json));

    assert_eq!(delete(&app, &uri, Some(&bob)).await.status(), StatusCode::FORBIDDEN);
    assert_eq!(delete(&app, &uri, Some(&alice)).await.status(), StatusCode::NO_CONTENT);
    assert_eq!(get(&app, &uri, Some(&alice)).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(delete(&app, &uri, Some(&alice)).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn messages_paginate_oldest_first() {
    let (app, state) = common::build_test_app();
    let (_a, alice) = signed_in_user(&app, &state, "Alice").await;
    let host = create_persona(&app, &alice, "Host").await;
    let (_, json) = create_conversation(
        &app,
        &alice,
        json!({ "title": "Count", "participants": [{ "persona_id": host, "role": "host" }] }),
    )
    .await;
    let uri = format!("/api/conversations/{}/messages", id_of(&json));

    for n in 1..=3 {
        let response = post_json(
            &app,
            &uri,
            Some(&alice),
            json!({ "persona_id": host, "content": format!("message {n}") }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let json = expect_json(
        get(&app, &format!("{uri}?limit=2&offset=1"), Some(&alice)).await,
        StatusCode::OK,
    )
    .await;
    let contents: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["message 2", "message 3"]);
}
