//! Row structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches
//!
//! Conversations and matches are documents defined in `parlor_core`; their
//! row mappings live in [`conversation`].

pub mod conversation;
pub mod message;
pub mod persona;
pub mod user;
