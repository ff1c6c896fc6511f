//! PostgreSQL-backed stores.
//!
//! Each store holds a clone of the pool. Column lists are kept in a `COLUMNS`
//! const per table so every query returns the same shape.

mod conversation;
mod game;
mod message;
mod persona;
mod user;

pub use conversation::PgConversationStore;
pub use game::PgMatchStore;
pub use message::PgMessageStore;
pub use persona::PgPersonaStore;
pub use user::PgUserStore;
