use async_trait::async_trait;
use parlor_core::game::Match;
use parlor_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::error::StoreResult;
use crate::stores::MatchStore;

#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn get(&self, match_id: DbId) -> StoreResult<Option<Match>> {
        let body: Option<Json<Match>> =
            sqlx::query_scalar("SELECT body FROM matches WHERE id = $1")
                .bind(match_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(body.map(|Json(game)| game))
    }

    async fn save(&self, game: &Match) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO matches (id, body, created_at, updated_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO UPDATE SET body = EXCLUDED.body, updated_at = EXCLUDED.updated_at",
        )
        .bind(game.match_id)
        .bind(Json(game))
        .bind(game.created_at)
        .bind(game.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
