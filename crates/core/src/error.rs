//! Domain errors shared by the stores, the repositories and both services.

use crate::types::DbId;

/// Why a domain operation was refused.
///
/// Each variant has a stable machine code (see [`CoreError::code`]) that the
/// HTTP layer puts in the `code` field of its error envelope.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The entity does not exist, or the caller may not know that it does.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// Input was well-formed but breaks a domain rule (blank title, leaving a
    /// conversation twice, ...).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The write lost a race (stale version), would duplicate a unique value,
    /// or is not allowed from the current conversation state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing or bad credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed. The message names the reason.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        CoreError::NotFound { entity, id }
    }

    /// Machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::Unauthorized(_) => "UNAUTHORIZED",
            CoreError::Forbidden(_) => "FORBIDDEN",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The message a client may see. Internal details are never exposed.
    pub fn public_message(&self) -> String {
        match self {
            CoreError::NotFound { .. } => self.to_string(),
            CoreError::Validation(msg)
            | CoreError::Conflict(msg)
            | CoreError::Unauthorized(msg)
            | CoreError::Forbidden(msg) => msg.clone(),
            CoreError::Internal(_) => "An internal error occurred".to_string(),
        }
    }
}
