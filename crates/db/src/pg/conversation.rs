use async_trait::async_trait;
use chrono::Utc;
use parlor_core::conversation::{Conversation, ConversationQuery};
use parlor_core::error::CoreError;
use parlor_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use parlor_core::types::DbId;
use serde_json::json;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::error::StoreResult;
use crate::models::conversation::ConversationRow;
use crate::stores::ConversationStore;

const COLUMNS: &str = "id, title, topic, description, created_by, participants, state, \
                       metadata, settings, history, schema_version, version, deleted_at, \
                       created_at, updated_at";

#[derive(Clone)]
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Distinguish a missing row from a stale version after a failed save.
    async fn save_failure(&self, id: DbId) -> StoreResult<CoreError> {
        let exists: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM conversations WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(match exists {
            Some(_) => CoreError::Conflict(
                "Conversation was modified concurrently; reload and retry".into(),
            ),
            None => CoreError::not_found("Conversation", id),
        })
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn insert(&self, conversation: &Conversation) -> StoreResult<Conversation> {
        let query = format!(
            "INSERT INTO conversations
                (id, title, topic, description, created_by, participants, state,
                 metadata, settings, history, schema_version, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 1, $12, $13)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ConversationRow>(&query)
            .bind(conversation.id)
            .bind(&conversation.title)
            .bind(&conversation.topic)
            .bind(&conversation.description)
            .bind(conversation.created_by)
            .bind(Json(&conversation.participants))
            .bind(Json(&conversation.state))
            .bind(&conversation.metadata)
            .bind(&conversation.settings)
            .bind(Json(&conversation.history))
            .bind(conversation.schema_version)
            .bind(conversation.created_at)
            .bind(conversation.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn fetch(&self, id: DbId) -> StoreResult<Option<Conversation>> {
        let query =
            format!("SELECT {COLUMNS} FROM conversations WHERE id = $1 AND deleted_at IS NULL");
        let row = sqlx::query_as::<_, ConversationRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Conversation::from))
    }

    async fn save(&self, conversation: &Conversation) -> StoreResult<Conversation> {
        let query = format!(
            "UPDATE conversations SET
                title = $3,
                topic = $4,
                description = $5,
                participants = $6,
                state = $7,
                metadata = $8,
                settings = $9,
                history = $10,
                schema_version = $11,
                updated_at = $12,
                version = version + 1
             WHERE id = $1 AND version = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, ConversationRow>(&query)
            .bind(conversation.id)
            .bind(conversation.version)
            .bind(&conversation.title)
            .bind(&conversation.topic)
            .bind(&conversation.description)
            .bind(Json(&conversation.participants))
            .bind(Json(&conversation.state))
            .bind(&conversation.metadata)
            .bind(&conversation.settings)
            .bind(Json(&conversation.history))
            .bind(conversation.schema_version)
            .bind(conversation.updated_at)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => Err(self.save_failure(conversation.id).await?.into()),
        }
    }

    async fn query(&self, query: &ConversationQuery) -> StoreResult<Vec<Conversation>> {
        let limit = clamp_limit(query.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        let offset = clamp_offset(query.offset);

        // Absent filters bind NULL and fall through their `IS NULL` arm.
        let participant = query
            .participant_persona_id
            .map(|id| Json(json!([{ "persona_id": id }])));
        let (scope_user, scope_personas) = match &query.visible_to {
            Some(scope) => (Some(scope.user_id), scope.persona_ids.clone()),
            None => (None, Vec::new()),
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM conversations
             WHERE deleted_at IS NULL
               AND ($1::uuid IS NULL OR created_by = $1)
               AND ($2::jsonb IS NULL OR participants @> $2)
               AND ($3::text IS NULL OR state ->> 'status' = $3)
               AND ($4::text IS NULL OR metadata -> 'tags' ? $4)
               AND ($5::text IS NULL OR settings ->> 'visibility' = $5)
               AND ($6::uuid IS NULL OR created_by = $6 OR EXISTS (
                     SELECT 1 FROM jsonb_array_elements(participants) AS p
                     WHERE (p ->> 'persona_id')::uuid = ANY($7::uuid[])))
             ORDER BY created_at DESC, id DESC
             LIMIT $8 OFFSET $9"
        );
        let rows = sqlx::query_as::<_, ConversationRow>(&sql)
            .bind(query.created_by)
            .bind(participant)
            .bind(query.status.map(|s| s.as_str()))
            .bind(&query.tag)
            .bind(&query.visibility)
            .bind(scope_user)
            .bind(scope_personas)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Conversation::from).collect())
    }

    async fn soft_delete(&self, id: DbId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE conversations SET deleted_at = $2, updated_at = $2, version = version + 1
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
