//! Storage traits.
//!
//! Handlers and repositories depend on these traits (as `Arc<dyn _>`), never
//! on a concrete backend. [`crate::pg`] implements them over PostgreSQL and
//! [`crate::memory`] over process-local maps.

use async_trait::async_trait;
use parlor_core::conversation::{Conversation, ConversationQuery};
use parlor_core::game::Match;
use parlor_core::persona::{AiConfig, Persona};
use parlor_core::types::{DbId, Timestamp};

use crate::error::StoreResult;
use crate::models::message::{CreateMessage, Message};
use crate::models::persona::{CreatePersona, UpdatePersona};
use crate::models::user::{CreateUser, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. A duplicate email is a `Conflict`.
    async fn create(&self, input: &CreateUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_verification_token(&self, token: &str) -> StoreResult<Option<User>>;

    /// Find the user holding `token` if it has not expired at `now`.
    async fn find_by_reset_token(&self, token: &str, now: Timestamp)
        -> StoreResult<Option<User>>;

    /// Flag the user verified and clear the verification token.
    async fn mark_verified(&self, id: DbId) -> StoreResult<bool>;

    /// Set `last_login_at` to now.
    async fn record_login(&self, id: DbId) -> StoreResult<()>;

    async fn update_name(&self, id: DbId, name: &str) -> StoreResult<Option<User>>;

    async fn set_reset_token(&self, id: DbId, token: &str, expires: Timestamp)
        -> StoreResult<()>;

    /// Replace the password hash and clear any reset token.
    async fn update_password(&self, id: DbId, password_hash: &str) -> StoreResult<bool>;

    async fn increment_usage(&self, id: DbId) -> StoreResult<()>;

    async fn delete(&self, id: DbId) -> StoreResult<bool>;
}

#[async_trait]
pub trait PersonaStore: Send + Sync {
    async fn create(&self, input: &CreatePersona) -> StoreResult<Persona>;

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<Persona>>;

    /// Fetch every persona in `ids` that exists. Order is unspecified.
    async fn find_many(&self, ids: &[DbId]) -> StoreResult<Vec<Persona>>;

    async fn list_by_owner(&self, owner_id: DbId) -> StoreResult<Vec<Persona>>;

    async fn list_all(&self, limit: i64, offset: i64) -> StoreResult<Vec<Persona>>;

    async fn update(&self, id: DbId, input: &UpdatePersona) -> StoreResult<Option<Persona>>;

    async fn set_ai_config(
        &self,
        id: DbId,
        is_ai_agent: bool,
        ai_config: Option<&AiConfig>,
    ) -> StoreResult<Option<Persona>>;
}

/// Document store for conversations.
///
/// Writes are optimistic: [`ConversationStore::save`] only succeeds when the
/// stored `version` equals the document's, and returns the document with the
/// bumped version.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a new document. The returned copy has `version = 1`.
    async fn insert(&self, conversation: &Conversation) -> StoreResult<Conversation>;

    /// Load a document; soft-deleted documents are `None`.
    async fn fetch(&self, id: DbId) -> StoreResult<Option<Conversation>>;

    /// Replace a document. `NotFound` if absent or deleted, `Conflict` if the
    /// version is stale.
    async fn save(&self, conversation: &Conversation) -> StoreResult<Conversation>;

    /// One page of non-deleted documents matching the query, newest first.
    async fn query(&self, query: &ConversationQuery) -> StoreResult<Vec<Conversation>>;

    /// Set `deleted_at`. Returns `false` if already deleted or absent.
    async fn soft_delete(&self, id: DbId) -> StoreResult<bool>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create(&self, input: &CreateMessage) -> StoreResult<Message>;

    /// Messages oldest first.
    async fn list_by_conversation(
        &self,
        conversation_id: DbId,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Message>>;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get(&self, match_id: DbId) -> StoreResult<Option<Match>>;

    /// Insert or replace the whole match document.
    async fn save(&self, game: &Match) -> StoreResult<()>;
}
