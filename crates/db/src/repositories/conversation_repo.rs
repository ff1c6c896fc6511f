//! Lifecycle operations over the conversation document.

use std::sync::Arc;

use chrono::Utc;
use parlor_core::conversation::{
    Conversation, ConversationQuery, ConversationUpdate, HistoryActor, NewConversation,
    NewParticipant,
};
use parlor_core::error::CoreError;
use parlor_core::types::DbId;

use crate::error::StoreResult;
use crate::stores::ConversationStore;

/// Read-modify-write operations on conversations. Every mutation loads the
/// document, applies one domain method and saves it with the loaded
/// `version`, so a concurrent writer surfaces as `Conflict` rather than a
/// lost update.
#[derive(Clone)]
pub struct ConversationRepository {
    store: Arc<dyn ConversationStore>,
}

impl ConversationRepository {
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self { store }
    }

    /// Build a new document with default state and persist it.
    pub async fn create(
        &self,
        input: NewConversation,
        created_by: DbId,
    ) -> StoreResult<Conversation> {
        let conversation = Conversation::new(DbId::new_v4(), input, created_by, Utc::now());
        let stored = self.store.insert(&conversation).await?;
        tracing::info!(
            conversation_id = %stored.id,
            created_by = %created_by,
            participants = stored.participants.len(),
            "Conversation created",
        );
        Ok(stored)
    }

    /// `None` when the conversation is absent or soft-deleted.
    pub async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Conversation>> {
        self.store.fetch(id).await
    }

    pub async fn find_by_query(&self, query: &ConversationQuery) -> StoreResult<Vec<Conversation>> {
        self.store.query(query).await
    }

    pub async fn update(
        &self,
        id: DbId,
        update: ConversationUpdate,
        actor: Option<HistoryActor>,
    ) -> StoreResult<Conversation> {
        let mut conversation = self.load(id).await?;
        conversation.apply_update(update, actor, Utc::now())?;
        let saved = self.store.save(&conversation).await?;
        tracing::info!(conversation_id = %id, version = saved.version, "Conversation updated");
        Ok(saved)
    }

    /// Returns the stored document unchanged when the persona is already a
    /// participant.
    pub async fn add_participant(
        &self,
        id: DbId,
        participant: NewParticipant,
        actor: Option<HistoryActor>,
    ) -> StoreResult<Conversation> {
        let mut conversation = self.load(id).await?;
        let persona_id = participant.persona_id;
        let now = Utc::now();
        if !conversation.add_participant(participant.into_participant(now), actor, now) {
            tracing::debug!(
                conversation_id = %id,
                persona_id = %persona_id,
                "Already a participant",
            );
            return Ok(conversation);
        }
        let saved = self.store.save(&conversation).await?;
        tracing::info!(conversation_id = %id, persona_id = %persona_id, "Participant added");
        Ok(saved)
    }

    /// Always saves and records a `participant_removed` entry, whether or not
    /// the persona was listed.
    pub async fn remove_participant(
        &self,
        id: DbId,
        persona_id: DbId,
        actor: Option<HistoryActor>,
    ) -> StoreResult<Conversation> {
        let mut conversation = self.load(id).await?;
        let was_participant = conversation.remove_participant(persona_id, actor, Utc::now());
        let saved = self.store.save(&conversation).await?;
        tracing::info!(
            conversation_id = %id,
            persona_id = %persona_id,
            was_participant,
            "Participant removed",
        );
        Ok(saved)
    }

    pub async fn leave_conversation(
        &self,
        id: DbId,
        persona_id: DbId,
    ) -> StoreResult<Conversation> {
        let mut conversation = self.load(id).await?;
        conversation.leave(persona_id, Utc::now())?;
        let saved = self.store.save(&conversation).await?;
        tracing::info!(conversation_id = %id, persona_id = %persona_id, "Participant left");
        Ok(saved)
    }

    pub async fn close_conversation(
        &self,
        id: DbId,
        closed_by: DbId,
        reason: Option<String>,
    ) -> StoreResult<Conversation> {
        let mut conversation = self.load(id).await?;
        conversation.close(closed_by, reason, Utc::now())?;
        let saved = self.store.save(&conversation).await?;
        tracing::info!(conversation_id = %id, closed_by = %closed_by, "Conversation closed");
        Ok(saved)
    }

    pub async fn pause_conversation(
        &self,
        id: DbId,
        actor: HistoryActor,
    ) -> StoreResult<Conversation> {
        let mut conversation = self.load(id).await?;
        conversation.pause(actor, Utc::now())?;
        let saved = self.store.save(&conversation).await?;
        tracing::info!(conversation_id = %id, "Conversation paused");
        Ok(saved)
    }

    pub async fn resume_conversation(
        &self,
        id: DbId,
        actor: HistoryActor,
    ) -> StoreResult<Conversation> {
        let mut conversation = self.load(id).await?;
        conversation.resume(actor, Utc::now())?;
        let saved = self.store.save(&conversation).await?;
        tracing::info!(conversation_id = %id, "Conversation resumed");
        Ok(saved)
    }

    /// `false` for a missing conversation, a closed message gate, a persona
    /// that is not a current participant, or one without `write`.
    pub async fn can_user_add_message(&self, id: DbId, persona_id: DbId) -> StoreResult<bool> {
        Ok(self
            .store
            .fetch(id)
            .await?
            .is_some_and(|c| c.can_persona_add_message(persona_id)))
    }

    /// Returns `false` if the conversation was already deleted or never
    /// existed.
    pub async fn soft_delete(&self, id: DbId) -> StoreResult<bool> {
        let deleted = self.store.soft_delete(id).await?;
        if deleted {
            tracing::info!(conversation_id = %id, "Conversation soft-deleted");
        }
        Ok(deleted)
    }

    async fn load(&self, id: DbId) -> StoreResult<Conversation> {
        self.store.fetch(id).await?.ok_or_else(|| CoreError::not_found("Conversation", id).into())
    }
}
