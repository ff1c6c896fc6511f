//! Domain types and pure logic shared by every Parlor crate.
//!
//! Nothing in here performs I/O. Persistence lives in `parlor-db`, HTTP in
//! `parlor-api` and `parlor-match`.

pub mod conversation;
pub mod error;
pub mod game;
pub mod pagination;
pub mod permissions;
pub mod persona;
pub mod roles;
pub mod types;
