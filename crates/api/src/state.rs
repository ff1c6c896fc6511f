use std::sync::Arc;

use parlor_db::memory::{
    MemoryConversationStore, MemoryMessageStore, MemoryPersonaStore, MemoryUserStore,
};
use parlor_db::pg::{PgConversationStore, PgMessageStore, PgPersonaStore, PgUserStore};
use parlor_db::repositories::{ConversationRepository, SecureConversationRepository};
use parlor_db::stores::{MessageStore, PersonaStore, UserStore};
use parlor_db::DbPool;
use parlor_events::EventBus;

use crate::config::ServerConfig;
use crate::middleware::auth::AuthUser;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheap to clone: everything is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// `None` when running on the in-memory stores.
    pub pool: Option<DbPool>,
    pub config: Arc<ServerConfig>,
    pub users: Arc<dyn UserStore>,
    pub personas: Arc<dyn PersonaStore>,
    pub conversations: ConversationRepository,
    pub messages: Arc<dyn MessageStore>,
    pub event_bus: Arc<EventBus>,
}

impl AppState {
    /// State backed by PostgreSQL.
    pub fn postgres(pool: DbPool, config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        Self {
            users: Arc::new(PgUserStore::new(pool.clone())),
            personas: Arc::new(PgPersonaStore::new(pool.clone())),
            conversations: ConversationRepository::new(Arc::new(PgConversationStore::new(
                pool.clone(),
            ))),
            messages: Arc::new(PgMessageStore::new(pool.clone())),
            pool: Some(pool),
            config: Arc::new(config),
            event_bus,
        }
    }

    /// State backed by the in-memory stores.
    pub fn in_memory(config: ServerConfig, event_bus: Arc<EventBus>) -> Self {
        let personas = Arc::new(MemoryPersonaStore::new());
        Self {
            pool: None,
            config: Arc::new(config),
            users: Arc::new(MemoryUserStore::with_personas(Arc::clone(&personas))),
            personas,
            conversations: ConversationRepository::new(Arc::new(MemoryConversationStore::new())),
            messages: Arc::new(MemoryMessageStore::new()),
            event_bus,
        }
    }

    /// The conversation repository as seen by `user`.
    pub fn secure_conversations(&self, user: &AuthUser) -> SecureConversationRepository {
        SecureConversationRepository::new(
            self.conversations.clone(),
            Arc::clone(&self.personas),
            user.actor(),
        )
    }
}
