use async_trait::async_trait;
use chrono::Utc;
use parlor_core::types::DbId;
use tokio::sync::RwLock;

use super::page;
use crate::error::StoreResult;
use crate::models::message::{CreateMessage, Message};
use crate::stores::MessageStore;

/// Messages in insertion order, which is also `created_at` order.
#[derive(Default)]
pub struct MemoryMessageStore {
    messages: RwLock<Vec<Message>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn create(&self, input: &CreateMessage) -> StoreResult<Message> {
        let message = Message {
            id: DbId::new_v4(),
            conversation_id: input.conversation_id,
            persona_id: input.persona_id,
            author_id: input.author_id,
            content: input.content.clone(),
            created_at: Utc::now(),
        };
        self.messages.write().await.push(message.clone());
        Ok(message)
    }

    async fn list_by_conversation(
        &self,
        conversation_id: DbId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>> {
        let matching = self
            .messages
            .read()
            .await
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        Ok(page(matching, limit, offset))
    }
}
