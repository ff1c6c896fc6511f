//! Stateless authorization predicates.
//!
//! The base predicates deliberately know nothing about admins: a super-admin
//! bypass is an explicit, separate check in calling code (see
//! [`PermissionEngine::can_manage_persona_as`]).

use crate::conversation::ConversationStatus;
use crate::persona::{Capability, Persona};
use crate::roles::ROLE_ADMIN;
use crate::types::DbId;

/// The authenticated user a request is performed on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: String,
}

impl Actor {
    pub fn new(user_id: DbId, role: impl Into<String>) -> Self {
        Self {
            user_id,
            role: role.into(),
        }
    }
}

/// Pure permission checks over (actor, target) pairs. No I/O, no state.
pub struct PermissionEngine;

impl PermissionEngine {
    /// `true` iff `user_id` owns the persona.
    pub fn can_user_manage_persona(user_id: DbId, persona: &Persona) -> bool {
        persona.owner_id == user_id
    }

    /// `true` iff the actor's role is `admin`.
    pub fn is_super_admin(actor: &Actor) -> bool {
        actor.role == ROLE_ADMIN
    }

    /// `true` iff the persona is an AI agent whose config grants `capability`.
    /// A missing config is a plain `false`.
    pub fn can_persona_perform_action(persona: &Persona, capability: Capability) -> bool {
        persona.is_ai_agent
            && persona
                .ai_config
                .as_ref()
                .is_some_and(|config| config.allows(capability))
    }

    pub fn can_persona_participate(persona_id: DbId, participant_ids: &[DbId]) -> bool {
        participant_ids.contains(&persona_id)
    }

    pub fn can_add_message_to_conversation(status: ConversationStatus) -> bool {
        status == ConversationStatus::Active
    }

    /// Ownership combined with the super-admin bypass.
    pub fn can_manage_persona_as(actor: &Actor, persona: &Persona) -> bool {
        Self::is_super_admin(actor) || Self::can_user_manage_persona(actor.user_id, persona)
    }
}
