//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is shared via `Arc<EventBus>`; publishing never blocks and
//! never fails, so handlers publish after their write has succeeded and move
//! on.

use chrono::{DateTime, Utc};
use parlor_core::types::DbId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event names published by the services.
pub mod event_types {
    pub const USER_REGISTERED: &str = "user.registered";
    pub const USER_VERIFIED: &str = "user.verified";
    pub const PASSWORD_RESET_REQUESTED: &str = "user.password_reset_requested";
    pub const USER_DELETED: &str = "user.deleted";
    pub const CONVERSATION_CREATED: &str = "conversation.created";
    pub const CONVERSATION_CLOSED: &str = "conversation.closed";
    pub const MESSAGE_POSTED: &str = "message.posted";
    pub const MATCH_CREATED: &str = "match.created";
    pub const MATCH_ROUND_COMPLETED: &str = "match.round_completed";
    pub const MATCH_COMPLETED: &str = "match.completed";
}

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// Something that happened, with enough context for subscribers to act.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Dot-separated event name, one of [`event_types`].
    pub event_type: String,

    /// Entity kind the event is about (`"user"`, `"conversation"`, `"match"`).
    pub subject_type: Option<String>,

    pub subject_id: Option<DbId>,

    /// User that triggered the event, when there is one.
    pub actor_user_id: Option<DbId>,

    pub payload: serde_json::Value,

    pub timestamp: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            subject_type: None,
            subject_id: None,
            actor_user_id: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: Utc::now(),
        }
    }

    pub fn with_subject(mut self, subject_type: impl Into<String>, subject_id: DbId) -> Self {
        self.subject_type = Some(subject_type.into());
        self.subject_id = Some(subject_id);
        self
    }

    pub fn with_actor(mut self, user_id: DbId) -> Self {
        self.actor_user_id = Some(user_id);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// String field from the payload, if present.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(serde_json::Value::as_str)
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out bus: every subscriber receives every event published after it
/// subscribed. Slow subscribers observe `RecvError::Lagged` once the buffer
/// overflows.
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to all current subscribers. Dropped silently if there are none.
    pub fn publish(&self, event: DomainEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
