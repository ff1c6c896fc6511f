//! Conversation operations layered over the stores.
//!
//! [`ConversationRepository`] owns the lifecycle (and therefore the history
//! log); [`SecureConversationRepository`] wraps it with per-actor access
//! checks.

pub mod conversation_repo;
pub mod secure_conversation_repo;

pub use conversation_repo::ConversationRepository;
pub use secure_conversation_repo::SecureConversationRepository;
