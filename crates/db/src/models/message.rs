//! Message entity model and DTOs.

use parlor_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub conversation_id: DbId,
    /// The persona the message was posted as.
    pub persona_id: DbId,
    /// The user who posted it.
    pub author_id: DbId,
    pub content: String,
    pub created_at: Timestamp,
}

/// DTO for appending a message.
#[derive(Debug, Clone)]
pub struct CreateMessage {
    pub conversation_id: DbId,
    pub persona_id: DbId,
    pub author_id: DbId,
    pub content: String,
}
