//! In-process stores backed by `tokio::sync::RwLock<HashMap<..>>`.
//!
//! They follow the same contracts as the PostgreSQL stores (duplicate
//! emails, versioned saves, soft deletes, newest-first listings) and are what
//! the test suites and `STORAGE_BACKEND=memory` run against. Nothing survives
//! a restart.

mod conversation;
mod game;
mod message;
mod persona;
mod user;

pub use conversation::MemoryConversationStore;
pub use game::MemoryMatchStore;
pub use message::MemoryMessageStore;
pub use persona::MemoryPersonaStore;
pub use user::MemoryUserStore;

/// Apply `limit`/`offset` to an already ordered list.
fn page<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let skip = usize::try_from(offset).unwrap_or(0);
    let take = usize::try_from(limit).unwrap_or(0);
    items.into_iter().skip(skip).take(take).collect()
}
