//! Personas and the AI-agent capability model.
//!
//! An "AI agent" is not a separate actor type: it is an ordinary persona,
//! owned by a user, whose allowed actions are declared through [`AiConfig`]
//! flags.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// An identity that can take part in conversations. Owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: DbId,
    pub owner_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub is_ai_agent: bool,
    pub ai_config: Option<AiConfig>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Capability flags for AI-agent personas. Absent flags mean "not allowed".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub can_create_conversations: bool,
    #[serde(default)]
    pub can_moderate_content: bool,
    #[serde(default)]
    pub can_add_participants: bool,
    /// Upper bound on conversation size when this persona adds participants.
    #[serde(default)]
    pub max_participants: Option<u32>,
}

/// A single action an AI-agent persona may be allowed to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CreateConversations,
    ModerateContent,
    AddParticipants,
}

impl AiConfig {
    /// Whether the flag backing `capability` is set.
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::CreateConversations => self.can_create_conversations,
            Capability::ModerateContent => self.can_moderate_content,
            Capability::AddParticipants => self.can_add_participants,
        }
    }
}
