use parlor_core::error::CoreError;

/// Error returned by every store and repository.
///
/// PostgreSQL stores surface driver errors as [`StoreError::Database`];
/// domain failures (not found, stale version, duplicate email) are
/// [`StoreError::Core`] regardless of backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type StoreResult<T> = Result<T, StoreError>;
