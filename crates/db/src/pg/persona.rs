use async_trait::async_trait;
use parlor_core::persona::{AiConfig, Persona};
use parlor_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::error::StoreResult;
use crate::models::persona::{CreatePersona, PersonaRow, UpdatePersona};
use crate::stores::PersonaStore;

const COLUMNS: &str =
    "id, owner_id, name, description, is_ai_agent, ai_config, created_at, updated_at";

#[derive(Clone)]
pub struct PgPersonaStore {
    pool: PgPool,
}

impl PgPersonaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PersonaStore for PgPersonaStore {
    async fn create(&self, input: &CreatePersona) -> StoreResult<Persona> {
        let query = format!(
            "INSERT INTO personas (id, owner_id, name, description, is_ai_agent, ai_config)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PersonaRow>(&query)
            .bind(DbId::new_v4())
            .bind(input.owner_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.is_ai_agent)
            .bind(input.ai_config.as_ref().map(Json))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Persona>> {
        let query = format!("SELECT {COLUMNS} FROM personas WHERE id = $1");
        let row = sqlx::query_as::<_, PersonaRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Persona::from))
    }

    async fn find_many(&self, ids: &[DbId]) -> StoreResult<Vec<Persona>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!("SELECT {COLUMNS} FROM personas WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, PersonaRow>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Persona::from).collect())
    }

    async fn list_by_owner(&self, owner_id: DbId) -> StoreResult<Vec<Persona>> {
        let query = format!(
            "SELECT {COLUMNS} FROM personas WHERE owner_id = $1 ORDER BY created_at DESC"
        );
        let rows = sqlx::query_as::<_, PersonaRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Persona::from).collect())
    }

    async fn list_all(&self, limit: i64, offset: i64) -> StoreResult<Vec<Persona>> {
        let query = format!(
            "SELECT {COLUMNS} FROM personas ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query_as::<_, PersonaRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Persona::from).collect())
    }

    async fn update(&self, id: DbId, input: &UpdatePersona) -> StoreResult<Option<Persona>> {
        let query = format!(
            "UPDATE personas SET
                name = COALESCE($2, name),
                description = COALESCE($3, description)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PersonaRow>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Persona::from))
    }

    async fn set_ai_config(
        &self,
        id: DbId,
        is_ai_agent: bool,
        ai_config: Option<&AiConfig>,
    ) -> StoreResult<Option<Persona>> {
        let query = format!(
            "UPDATE personas SET is_ai_agent = $2, ai_config = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let row = sqlx::query_as::<_, PersonaRow>(&query)
            .bind(id)
            .bind(is_ai_agent)
            .bind(ai_config.map(Json))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Persona::from))
    }
}
