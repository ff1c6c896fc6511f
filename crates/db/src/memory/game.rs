use std::collections::HashMap;

use async_trait::async_trait;
use parlor_core::game::Match;
use parlor_core::types::DbId;
use tokio::sync::RwLock;

use crate::error::StoreResult;
use crate::stores::MatchStore;

#[derive(Default)]
pub struct MemoryMatchStore {
    matches: RwLock<HashMap<DbId, Match>>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn get(&self, match_id: DbId) -> StoreResult<Option<Match>> {
        Ok(self.matches.read().await.get(&match_id).cloned())
    }

    async fn save(&self, game: &Match) -> StoreResult<()> {
        self.matches
            .write()
            .await
            .insert(game.match_id, game.clone());
        Ok(())
    }
}
