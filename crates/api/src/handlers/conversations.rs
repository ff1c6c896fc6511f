//! Handlers for the `/conversations` resource.
//!
//! Every handler goes through [`SecureConversationRepository`] bound to the
//! caller, so access rules live in one place.
//!
//! [`SecureConversationRepository`]: parlor_db::repositories::SecureConversationRepository

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use parlor_core::conversation::{
    Conversation, ConversationQuery, ConversationUpdate, NewConversation, NewParticipant,
};
use parlor_core::error::CoreError;
use parlor_core::types::DbId;
use parlor_db::models::message::CreateMessage;
use parlor_events::{event_types, DomainEvent};
use serde::Deserialize;
use serde_json::json;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppPath, AppQuery, ValidJson};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// First message posted right after the conversation is created.
#[derive(Debug, Deserialize, Validate)]
pub struct InitialMessage {
    pub persona_id: DbId,
    #[validate(length(min = 1, max = 10000, message = "Message content is required"))]
    pub content: String,
}

/// Body for `POST /conversations`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateConversationRequest {
    #[validate(
        custom(function = "not_blank", message = "Title is required"),
        length(max = 200, message = "Title must be at most 200 characters")
    )]
    pub title: String,
    pub topic: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub participants: Vec<NewParticipant>,
    pub metadata: Option<serde_json::Value>,
    pub settings: Option<serde_json::Value>,
    pub restrictions: Option<Vec<String>>,
    #[validate(nested)]
    pub initial_message: Option<InitialMessage>,
}

/// Rejects strings that are empty once trimmed.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct CloseRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/conversations
///
/// Query parameters follow [`ConversationQuery`]. Only conversations the
/// caller can read are listed.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ConversationQuery>,
) -> AppResult<Json<DataResponse<Vec<Conversation>>>> {
    let conversations = state
        .secure_conversations(&auth)
        .find_by_query(&query)
        .await?;
    Ok(Json(DataResponse {
        data: conversations,
    }))
}

/// POST /api/conversations
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateConversationRequest>,
) -> AppResult<(StatusCode, Json<Conversation>)> {
    let repo = state.secure_conversations(&auth);
    let CreateConversationRequest {
        title,
        topic,
        description,
        participants,
        metadata,
        settings,
        restrictions,
        initial_message,
    } = input;

    let conversation = repo
        .create(NewConversation {
            title: title.trim().to_string(),
            topic,
            description,
            participants,
            metadata,
            settings,
            restrictions,
        })
        .await?;

    tracing::info!(
        conversation_id = %conversation.id,
        user_id = %auth.user_id,
        "Conversation created",
    );
    state.event_bus.publish(
        DomainEvent::new(event_types::CONVERSATION_CREATED)
            .with_subject("conversation", conversation.id)
            .with_actor(auth.user_id)
            .with_payload(json!({ "title": conversation.title })),
    );

    if let Some(first) = initial_message {
        repo.authorize_message(conversation.id, first.persona_id)
            .await?;
        let message = state
            .messages
            .create(&CreateMessage {
                conversation_id: conversation.id,
                persona_id: first.persona_id,
                author_id: auth.user_id,
                content: first.content,
            })
            .await?;
        state.users.increment_usage(auth.user_id).await?;
        publish_message_posted(&state, &auth, message.id, conversation.id, first.persona_id);
    }

    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/conversations/{id}
///
/// An inaccessible conversation is reported exactly like a missing one.
pub async fn get_by_id(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
) -> AppResult<Json<Conversation>> {
    let conversation = state
        .secure_conversations(&auth)
        .find_by_id(id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Conversation", id)))?;
    Ok(Json(conversation))
}

/// PATCH /api/conversations/{id}
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    AppJson(mut input): AppJson<ConversationUpdate>,
) -> AppResult<Json<Conversation>> {
    if let Some(title) = input.title.take() {
        let title = title.trim();
        if title.is_empty() {
            return Err(CoreError::Validation("Title cannot be blank".into()).into());
        }
        input.title = Some(title.to_string());
    }
    let conversation = state.secure_conversations(&auth).update(id, input).await?;
    Ok(Json(conversation))
}

/// DELETE /api/conversations/{id}
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
) -> AppResult<StatusCode> {
    if state.secure_conversations(&auth).soft_delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::not_found("Conversation", id)))
    }
}

/// POST /api/conversations/{id}/participants
pub async fn add_participant(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    AppJson(input): AppJson<NewParticipant>,
) -> AppResult<Json<Conversation>> {
    let conversation = state
        .secure_conversations(&auth)
        .add_participant(id, input)
        .await?;
    Ok(Json(conversation))
}

/// DELETE /api/conversations/{id}/participants/{persona_id}
pub async fn remove_participant(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath((id, persona_id)): AppPath<(DbId, DbId)>,
) -> AppResult<Json<Conversation>> {
    let conversation = state
        .secure_conversations(&auth)
        .remove_participant(id, persona_id)
        .await?;
    Ok(Json(conversation))
}

/// POST /api/conversations/{id}/participants/{persona_id}/leave
pub async fn leave(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath((id, persona_id)): AppPath<(DbId, DbId)>,
) -> AppResult<Json<Conversation>> {
    let conversation = state
        .secure_conversations(&auth)
        .leave_conversation(id, persona_id)
        .await?;
    Ok(Json(conversation))
}

/// POST /api/conversations/{id}/close
///
/// The body is optional; `{"reason": "..."}` is recorded in the state. A
/// request without a JSON content type is treated as having no body.
pub async fn close(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    input: Result<Json<CloseRequest>, JsonRejection>,
) -> AppResult<Json<Conversation>> {
    let reason = match input {
        Ok(Json(body)) => body.reason,
        Err(JsonRejection::MissingJsonContentType(_)) => None,
        Err(rejection) => return Err(rejection.into()),
    };
    let conversation = state
        .secure_conversations(&auth)
        .close_conversation(id, reason)
        .await?;

    state.event_bus.publish(
        DomainEvent::new(event_types::CONVERSATION_CLOSED)
            .with_subject("conversation", id)
            .with_actor(auth.user_id)
            .with_payload(json!({ "reason": conversation.state.close_reason })),
    );
    Ok(Json(conversation))
}

/// POST /api/conversations/{id}/pause
pub async fn pause(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
) -> AppResult<Json<Conversation>> {
    let conversation = state
        .secure_conversations(&auth)
        .pause_conversation(id)
        .await?;
    Ok(Json(conversation))
}

/// POST /api/conversations/{id}/resume
pub async fn resume(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
) -> AppResult<Json<Conversation>> {
    let conversation = state
        .secure_conversations(&auth)
        .resume_conversation(id)
        .await?;
    Ok(Json(conversation))
}

pub(crate) fn publish_message_posted(
    state: &AppState,
    auth: &AuthUser,
    message_id: DbId,
    conversation_id: DbId,
    persona_id: DbId,
) {
    state.event_bus.publish(
        DomainEvent::new(event_types::MESSAGE_POSTED)
            .with_subject("conversation", conversation_id)
            .with_actor(auth.user_id)
            .with_payload(json!({
                "message_id": message_id,
                "persona_id": persona_id,
            })),
    );
}
