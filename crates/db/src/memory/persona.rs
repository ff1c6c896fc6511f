use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parlor_core::persona::{AiConfig, Persona};
use parlor_core::types::DbId;
use tokio::sync::RwLock;

use super::page;
use crate::error::StoreResult;
use crate::models::persona::{CreatePersona, UpdatePersona};
use crate::stores::PersonaStore;

#[derive(Default)]
pub struct MemoryPersonaStore {
    personas: RwLock<HashMap<DbId, Persona>>,
}

impl MemoryPersonaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every persona owned by `owner_id`. Returns how many were removed.
    pub async fn remove_owned_by(&self, owner_id: DbId) -> usize {
        let mut personas = self.personas.write().await;
        let before = personas.len();
        personas.retain(|_, p| p.owner_id != owner_id);
        before - personas.len()
    }
}

fn newest_first(mut personas: Vec<Persona>) -> Vec<Persona> {
    personas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    personas
}

#[async_trait]
impl PersonaStore for MemoryPersonaStore {
    async fn create(&self, input: &CreatePersona) -> StoreResult<Persona> {
        let now = Utc::now();
        let persona = Persona {
            id: DbId::new_v4(),
            owner_id: input.owner_id,
            name: input.name.clone(),
            description: input.description.clone(),
            is_ai_agent: input.is_ai_agent,
            ai_config: input.ai_config.clone(),
            created_at: now,
            updated_at: now,
        };
        self.personas
            .write()
            .await
            .insert(persona.id, persona.clone());
        Ok(persona)
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Persona>> {
        Ok(self.personas.read().await.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[DbId]) -> StoreResult<Vec<Persona>> {
        let personas = self.personas.read().await;
        Ok(ids.iter().filter_map(|id| personas.get(id).cloned()).collect())
    }

    async fn list_by_owner(&self, owner_id: DbId) -> StoreResult<Vec<Persona>> {
        let owned = self
            .personas
            .read()
            .await
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(newest_first(owned))
    }

    async fn list_all(&self, limit: i64, offset: i64) -> StoreResult<Vec<Persona>> {
        let all = self.personas.read().await.values().cloned().collect();
        Ok(page(newest_first(all), limit, offset))
    }

    async fn update(&self, id: DbId, input: &UpdatePersona) -> StoreResult<Option<Persona>> {
        let mut personas = self.personas.write().await;
        let Some(persona) = personas.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &input.name {
            persona.name = name.clone();
        }
        if let Some(description) = &input.description {
            persona.description = Some(description.clone());
        }
        persona.updated_at = Utc::now();
        Ok(Some(persona.clone()))
    }

    async fn set_ai_config(
        &self,
        id: DbId,
        is_ai_agent: bool,
        ai_config: Option<&AiConfig>,
    ) -> StoreResult<Option<Persona>> {
        let mut personas = self.personas.write().await;
        let Some(persona) = personas.get_mut(&id) else {
            return Ok(None);
        };
        persona.is_ai_agent = is_ai_agent;
        persona.ai_config = ai_config.cloned();
        persona.updated_at = Utc::now();
        Ok(Some(persona.clone()))
    }
}
