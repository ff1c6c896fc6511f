//! HTTP service for the "guess who's human" party game.
//!
//! One human (identity `A`) plays against three scripted participants
//! (`B`, `C`, `D`) over five rounds of answer-then-vote. Matches live in an
//! injected [`parlor_db::stores::MatchStore`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
