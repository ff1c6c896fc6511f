use async_trait::async_trait;
use parlor_core::types::DbId;
use sqlx::PgPool;

use crate::error::StoreResult;
use crate::models::message::{CreateMessage, Message};
use crate::stores::MessageStore;

const COLUMNS: &str = "id, conversation_id, persona_id, author_id, content, created_at";

#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn create(&self, input: &CreateMessage) -> StoreResult<Message> {
        let query = format!(
            "INSERT INTO messages (id, conversation_id, persona_id, author_id, content)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Message>(&query)
            .bind(DbId::new_v4())
            .bind(input.conversation_id)
            .bind(input.persona_id)
            .bind(input.author_id)
            .bind(&input.content)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_by_conversation(
        &self,
        conversation_id: DbId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        let query = format!(
            "SELECT {COLUMNS} FROM messages
             WHERE conversation_id = $1
             ORDER BY created_at ASC, id ASC
             LIMIT $2 OFFSET $3"
        );
        Ok(sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }
}
