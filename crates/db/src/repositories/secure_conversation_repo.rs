//! Per-actor access control over [`ConversationRepository`].
//!
//! Reads hide what the actor cannot see (`None`, or omitted from a list) so
//! existence is never leaked. Writes fail with [`CoreError::Forbidden`]
//! carrying the reason. A conversation or persona that does not exist is
//! [`CoreError::NotFound`] in both cases.
//!
//! Access rules:
//!
//! ```text
//! read                       admin | creator | owner of any participant persona
//! create                     actor manages every host; AI hosts need can_create_conversations
//! update / soft_delete       admin | creator
//! add_participant            admin | creator | owned AI participant with can_add_participants
//!                            (that persona's max_participants applies)
//! remove_participant         admin | creator | manager of the removed persona
//! leave                      manager of the leaving persona
//! close / pause / resume     admin | creator | owned AI participant with can_moderate_content
//! post message               manager of the sender + base message gate
//! ```

use std::sync::Arc;

use parlor_core::conversation::{
    AccessScope, Conversation, ConversationQuery, ConversationUpdate, HistoryActor,
    NewConversation, NewParticipant, ParticipantRole,
};
use parlor_core::error::CoreError;
use parlor_core::permissions::{Actor, PermissionEngine};
use parlor_core::persona::{Capability, Persona};
use parlor_core::types::DbId;

use super::ConversationRepository;
use crate::error::{StoreError, StoreResult};
use crate::stores::PersonaStore;

/// A [`ConversationRepository`] bound to one authenticated actor.
pub struct SecureConversationRepository {
    base: ConversationRepository,
    personas: Arc<dyn PersonaStore>,
    actor: Actor,
}

impl SecureConversationRepository {
    pub fn new(
        base: ConversationRepository,
        personas: Arc<dyn PersonaStore>,
        actor: Actor,
    ) -> Self {
        Self {
            base,
            personas,
            actor,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Conversation>> {
        let Some(conversation) = self.base.find_by_id(id).await? else {
            return Ok(None);
        };
        Ok(self
            .can_access(&conversation)
            .await?
            .then_some(conversation))
    }

    /// One page of the conversations matching `query` that the actor can read.
    ///
    /// Non-admins are scoped inside the store query, so pagination counts
    /// only what they may see.
    pub async fn find_by_query(&self, query: &ConversationQuery) -> StoreResult<Vec<Conversation>> {
        let mut query = query.clone();
        query.visible_to = if PermissionEngine::is_super_admin(&self.actor) {
            None
        } else {
            let owned = self.personas.list_by_owner(self.actor.user_id).await?;
            Some(AccessScope {
                user_id: self.actor.user_id,
                persona_ids: owned.into_iter().map(|p| p.id).collect(),
            })
        };
        self.base.find_by_query(&query).await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    pub async fn create(&self, input: NewConversation) -> StoreResult<Conversation> {
        let ids: Vec<DbId> = input.participants.iter().map(|p| p.persona_id).collect();
        let personas = self.load_personas(&ids).await?;

        for host in input
            .participants
            .iter()
            .filter(|p| p.role == ParticipantRole::Host)
        {
            let Some(persona) = personas.iter().find(|p| p.id == host.persona_id) else {
                continue;
            };
            if !PermissionEngine::can_manage_persona_as(&self.actor, persona) {
                return Err(self.deny(format!(
                    "You cannot host a conversation as persona {}",
                    persona.name
                )));
            }
            if persona.is_ai_agent
                && !PermissionEngine::can_persona_perform_action(
                    persona,
                    Capability::CreateConversations,
                )
            {
                return Err(self.deny(format!(
                    "AI persona {} is not allowed to create conversations",
                    persona.name
                )));
            }
        }

        self.base.create(input, self.actor.user_id).await
    }

    pub async fn update(&self, id: DbId, update: ConversationUpdate) -> StoreResult<Conversation> {
        let conversation = self.load(id).await?;
        if !self.is_manager(&conversation) {
            return Err(self.deny("Only the creator or an admin can update this conversation"));
        }
        self.base
            .update(id, update, Some(HistoryActor::user(self.actor.user_id)))
            .await
    }

    pub async fn soft_delete(&self, id: DbId) -> StoreResult<bool> {
        let conversation = self.load(id).await?;
        if !self.is_manager(&conversation) {
            return Err(self.deny("Only the creator or an admin can delete this conversation"));
        }
        self.base.soft_delete(id).await
    }

    pub async fn add_participant(
        &self,
        id: DbId,
        participant: NewParticipant,
    ) -> StoreResult<Conversation> {
        let conversation = self.load(id).await?;
        self.load_persona(participant.persona_id).await?;

        if self.is_manager(&conversation) {
            return self
                .base
                .add_participant(id, participant, Some(HistoryActor::user(self.actor.user_id)))
                .await;
        }

        let Some(agent) = self
            .owned_agent_with(&conversation, Capability::AddParticipants)
            .await?
        else {
            return Err(self.deny("You are not allowed to add participants to this conversation"));
        };

        if let Some(max) = agent.ai_config.as_ref().and_then(|c| c.max_participants) {
            let already_listed = conversation.participant(participant.persona_id).is_some();
            let max = usize::try_from(max).unwrap_or(usize::MAX);
            if !already_listed && conversation.current_participant_count() >= max {
                return Err(self.deny(format!(
                    "Persona {} may not grow a conversation beyond {max} participants",
                    agent.name
                )));
            }
        }

        self.base
            .add_participant(id, participant, Some(HistoryActor::persona(agent.id)))
            .await
    }

    pub async fn remove_participant(
        &self,
        id: DbId,
        persona_id: DbId,
    ) -> StoreResult<Conversation> {
        let conversation = self.load(id).await?;
        if !self.is_manager(&conversation) {
            let manages_persona = self
                .personas
                .find_by_id(persona_id)
                .await?
                .is_some_and(|p| PermissionEngine::can_user_manage_persona(self.actor.user_id, &p));
            if !manages_persona {
                return Err(self.deny("You are not allowed to remove this participant"));
            }
        }
        self.base
            .remove_participant(id, persona_id, Some(HistoryActor::user(self.actor.user_id)))
            .await
    }

    pub async fn leave_conversation(
        &self,
        id: DbId,
        persona_id: DbId,
    ) -> StoreResult<Conversation> {
        self.load(id).await?;
        let persona = self.load_persona(persona_id).await?;
        if !PermissionEngine::can_manage_persona_as(&self.actor, &persona) {
            return Err(self.deny(format!("You do not control persona {}", persona.name)));
        }
        self.base.leave_conversation(id, persona_id).await
    }

    pub async fn close_conversation(
        &self,
        id: DbId,
        reason: Option<String>,
    ) -> StoreResult<Conversation> {
        let conversation = self.load(id).await?;
        self.authorize_moderation(&conversation, "close").await?;
        self.base
            .close_conversation(id, self.actor.user_id, reason)
            .await
    }

    pub async fn pause_conversation(&self, id: DbId) -> StoreResult<Conversation> {
        let conversation = self.load(id).await?;
        let actor = self.authorize_moderation(&conversation, "pause").await?;
        self.base.pause_conversation(id, actor).await
    }

    pub async fn resume_conversation(&self, id: DbId) -> StoreResult<Conversation> {
        let conversation = self.load(id).await?;
        let actor = self.authorize_moderation(&conversation, "resume").await?;
        self.base.resume_conversation(id, actor).await
    }

    /// Check that the actor may post into `id` as `persona_id`.
    ///
    /// The message itself is stored by the caller; this only decides.
    pub async fn authorize_message(&self, id: DbId, persona_id: DbId) -> StoreResult<Conversation> {
        let persona = self.load_persona(persona_id).await?;
        let conversation = self.load(id).await?;
        if !PermissionEngine::can_manage_persona_as(&self.actor, &persona) {
            return Err(self.deny(format!("You do not control persona {}", persona.name)));
        }
        if !PermissionEngine::can_add_message_to_conversation(conversation.state.status) {
            return Err(self.deny(format!(
                "Conversation is {}",
                conversation.state.status.as_str()
            )));
        }
        if !self.base.can_user_add_message(id, persona_id).await? {
            return Err(self.deny(format!(
                "Persona {} cannot post in this conversation",
                persona.name
            )));
        }
        Ok(conversation)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn is_manager(&self, conversation: &Conversation) -> bool {
        PermissionEngine::is_super_admin(&self.actor)
            || conversation.created_by == self.actor.user_id
    }

    async fn can_access(&self, conversation: &Conversation) -> StoreResult<bool> {
        if self.is_manager(conversation) {
            return Ok(true);
        }
        let ids: Vec<DbId> = conversation.participants.iter().map(|p| p.persona_id).collect();
        let personas = self.personas.find_many(&ids).await?;
        Ok(personas
            .iter()
            .any(|p| PermissionEngine::can_user_manage_persona(self.actor.user_id, p)))
    }

    /// A current participant persona owned by the actor that is an AI agent
    /// holding `capability`.
    async fn owned_agent_with(
        &self,
        conversation: &Conversation,
        capability: Capability,
    ) -> StoreResult<Option<Persona>> {
        let ids: Vec<DbId> = conversation
            .participants
            .iter()
            .filter(|p| p.is_current())
            .map(|p| p.persona_id)
            .collect();
        let personas = self.personas.find_many(&ids).await?;
        Ok(personas.into_iter().find(|p| {
            PermissionEngine::can_user_manage_persona(self.actor.user_id, p)
                && PermissionEngine::can_persona_perform_action(p, capability)
        }))
    }

    /// Resolve who performs a moderation action, or refuse it.
    async fn authorize_moderation(
        &self,
        conversation: &Conversation,
        verb: &str,
    ) -> StoreResult<HistoryActor> {
        if self.is_manager(conversation) {
            return Ok(HistoryActor::user(self.actor.user_id));
        }
        match self
            .owned_agent_with(conversation, Capability::ModerateContent)
            .await?
        {
            Some(agent) => Ok(HistoryActor::persona(agent.id)),
            None => Err(self.deny(format!("You are not allowed to {verb} this conversation"))),
        }
    }

    async fn load(&self, id: DbId) -> StoreResult<Conversation> {
        self.base
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Conversation", id).into())
    }

    async fn load_persona(&self, id: DbId) -> StoreResult<Persona> {
        self.personas
            .find_by_id(id)
            .await?
            .ok_or_else(|| CoreError::not_found("Persona", id).into())
    }

    /// Every persona in `ids`, or `NotFound` for the first unknown one.
    async fn load_personas(&self, ids: &[DbId]) -> StoreResult<Vec<Persona>> {
        let found = self.personas.find_many(ids).await?;
        if let Some(missing) = ids.iter().find(|id| found.iter().all(|p| p.id != **id)) {
            return Err(CoreError::not_found("Persona", *missing).into());
        }
        Ok(found)
    }

    fn deny(&self, reason: impl Into<String>) -> StoreError {
        let reason = reason.into();
        tracing::warn!(
            user_id = %self.actor.user_id,
            reason = %reason,
            "Conversation access denied",
        );
        CoreError::Forbidden(reason).into()
    }
}
