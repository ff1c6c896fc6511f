//! Persistence layer.
//!
//! - [`stores`] -- storage traits, one per entity, used as `Arc<dyn _>`.
//! - [`pg`] -- PostgreSQL implementations (JSONB documents via sqlx).
//! - [`memory`] -- in-process implementations for tests and local runs.
//! - [`repositories`] -- conversation lifecycle operations and the
//!   permission-checking wrapper built on top of the stores.

pub mod error;
pub mod memory;
pub mod models;
pub mod pg;
pub mod repositories;
pub mod stores;

use sqlx::postgres::PgPoolOptions;

pub use error::{StoreError, StoreResult};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Cheap round-trip used by startup and `/health`.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
