//! Persona rows and DTOs. The domain struct is [`parlor_core::persona::Persona`].

use parlor_core::persona::{AiConfig, Persona};
use parlor_core::types::{DbId, Timestamp};
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from the `personas` table.
#[derive(Debug, Clone, FromRow)]
pub struct PersonaRow {
    pub id: DbId,
    pub owner_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub is_ai_agent: bool,
    pub ai_config: Option<Json<AiConfig>>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<PersonaRow> for Persona {
    fn from(row: PersonaRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            description: row.description,
            is_ai_agent: row.is_ai_agent,
            ai_config: row.ai_config.map(|Json(config)| config),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// DTO for creating a persona.
#[derive(Debug, Clone)]
pub struct CreatePersona {
    pub owner_id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub is_ai_agent: bool,
    pub ai_config: Option<AiConfig>,
}

/// DTO for updating a persona's public fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePersona {
    pub name: Option<String>,
    pub description: Option<String>,
}
