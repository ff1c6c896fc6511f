//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- HS256 token generation and validation.
//! - [`token`] -- random one-time tokens for email verification and resets.

pub mod jwt;
pub mod password;
pub mod token;
