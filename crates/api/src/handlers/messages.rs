//! Handlers for `/conversations/{id}/messages`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use parlor_core::error::CoreError;
use parlor_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use parlor_core::types::DbId;
use parlor_db::models::message::{CreateMessage, Message};
use serde::Deserialize;
use validator::Validate;

use super::conversations::publish_message_posted;
use crate::error::{AppError, AppResult};
use crate::extract::{AppPath, AppQuery, ValidJson};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageRequest {
    pub persona_id: DbId,
    #[validate(length(min = 1, max = 10000, message = "Message content is required"))]
    pub content: String,
}

/// GET /api/conversations/{id}/messages
///
/// Oldest first. Requires read access to the conversation.
pub async fn list(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    AppQuery(params): AppQuery<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<Message>>>> {
    state
        .secure_conversations(&auth)
        .find_by_id(id)
        .await?
        .ok_or(AppError::Core(CoreError::not_found("Conversation", id)))?;

    let limit = clamp_limit(params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = clamp_offset(params.offset);
    let messages = state
        .messages
        .list_by_conversation(id, limit, offset)
        .await?;
    Ok(Json(DataResponse { data: messages }))
}

/// POST /api/conversations/{id}/messages
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<DbId>,
    ValidJson(input): ValidJson<PostMessageRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    state
        .secure_conversations(&auth)
        .authorize_message(id, input.persona_id)
        .await?;

    let message = state
        .messages
        .create(&CreateMessage {
            conversation_id: id,
            persona_id: input.persona_id,
            author_id: auth.user_id,
            content: input.content,
        })
        .await?;
    state.users.increment_usage(auth.user_id).await?;

    tracing::debug!(message_id = %message.id, conversation_id = %id, "Message posted");
    publish_message_posted(&state, &auth, message.id, id, input.persona_id);

    Ok((StatusCode::CREATED, Json(message)))
}
