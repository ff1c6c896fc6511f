use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parlor_core::conversation::{Conversation, ConversationQuery};
use parlor_core::error::CoreError;
use parlor_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use parlor_core::types::DbId;
use tokio::sync::RwLock;

use super::page;
use crate::error::StoreResult;
use crate::stores::ConversationStore;

#[derive(Default)]
pub struct MemoryConversationStore {
    documents: RwLock<HashMap<DbId, Conversation>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn insert(&self, conversation: &Conversation) -> StoreResult<Conversation> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(&conversation.id) {
            return Err(CoreError::Conflict(format!(
                "Conversation {} already exists",
                conversation.id
            ))
            .into());
        }
        let mut stored = conversation.clone();
        stored.version = 1;
        documents.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn fetch(&self, id: DbId) -> StoreResult<Option<Conversation>> {
        Ok(self
            .documents
            .read()
            .await
            .get(&id)
            .filter(|c| !c.is_deleted())
            .cloned())
    }

    async fn save(&self, conversation: &Conversation) -> StoreResult<Conversation> {
        let mut documents = self.documents.write().await;
        let current = documents
            .get(&conversation.id)
            .filter(|c| !c.is_deleted())
            .ok_or(CoreError::not_found("Conversation", conversation.id))?;
        if current.version != conversation.version {
            return Err(CoreError::Conflict(
                "Conversation was modified concurrently; reload and retry".into(),
            )
            .into());
        }

        let mut stored = conversation.clone();
        stored.version += 1;
        stored.created_at = current.created_at;
        stored.created_by = current.created_by;
        documents.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn query(&self, query: &ConversationQuery) -> StoreResult<Vec<Conversation>> {
        let limit = clamp_limit(query.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        let offset = clamp_offset(query.offset);

        let mut found: Vec<Conversation> = self
            .documents
            .read()
            .await
            .values()
            .filter(|c| !c.is_deleted() && query.matches(c))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(page(found, limit, offset))
    }

    async fn soft_delete(&self, id: DbId) -> StoreResult<bool> {
        let mut documents = self.documents.write().await;
        match documents.get_mut(&id) {
            Some(c) if !c.is_deleted() => {
                let now = Utc::now();
                c.deleted_at = Some(now);
                c.updated_at = now;
                c.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
