//! Row mapping for the `conversations` table.
//!
//! JSONB columns are decoded into the strongly-typed document structs from
//! `parlor_core::conversation`; a malformed document fails at the store
//! boundary instead of leaking loosely-typed values upward.

use parlor_core::conversation::{Conversation, ConversationState, HistoryEntry, Participant};
use parlor_core::types::{DbId, Timestamp};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct ConversationRow {
    pub id: DbId,
    pub title: String,
    pub topic: Option<String>,
    pub description: Option<String>,
    pub created_by: DbId,
    pub participants: Json<Vec<Participant>>,
    pub state: Json<ConversationState>,
    pub metadata: serde_json::Value,
    pub settings: serde_json::Value,
    pub history: Json<Vec<HistoryEntry>>,
    pub schema_version: i32,
    pub version: i64,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<ConversationRow> for Conversation {
    fn from(row: ConversationRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            topic: row.topic,
            description: row.description,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            participants: row.participants.0,
            state: row.state.0,
            metadata: row.metadata,
            settings: row.settings,
            history: row.history.0,
            schema_version: row.schema_version,
            version: row.version,
            deleted_at: row.deleted_at,
        }
    }
}
