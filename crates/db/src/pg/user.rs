use async_trait::async_trait;
use parlor_core::error::CoreError;
use parlor_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};
use crate::models::user::{CreateUser, User};
use crate::stores::UserStore;

const COLUMNS: &str = "id, name, email, password_hash, role, is_verified, verification_token, \
                       reset_password_token, reset_password_expires, last_login_at, usage_count, \
                       created_at, updated_at";

const EMAIL_CONSTRAINT: &str = "uq_users_email";

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, input: &CreateUser) -> StoreResult<User> {
        let query = format!(
            "INSERT INTO users (id, name, email, password_hash, role, verification_token)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(DbId::new_v4())
            .bind(&input.name)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.role)
            .bind(&input.verification_token)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                let duplicate = err
                    .as_database_error()
                    .and_then(|db| db.constraint())
                    .is_some_and(|c| c == EMAIL_CONSTRAINT);
                if duplicate {
                    CoreError::Conflict("Email is already registered".into()).into()
                } else {
                    StoreError::Database(err)
                }
            })
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<User>> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_verification_token(&self, token: &str) -> StoreResult<Option<User>> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE verification_token = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: Timestamp,
    ) -> StoreResult<Option<User>> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE reset_password_token = $1 AND reset_password_expires > $2"
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn mark_verified(&self, id: DbId) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET is_verified = true, verification_token = NULL WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_login(&self, id: DbId) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_name(&self, id: DbId, name: &str) -> StoreResult<Option<User>> {
        let query = format!("UPDATE users SET name = $2 WHERE id = $1 RETURNING {COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_reset_token(
        &self,
        id: DbId,
        token: &str,
        expires: Timestamp,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE users SET reset_password_token = $2, reset_password_expires = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(token)
        .bind(expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_password(&self, id: DbId, password_hash: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET
                password_hash = $2,
                reset_password_token = NULL,
                reset_password_expires = NULL
             WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_usage(&self, id: DbId) -> StoreResult<()> {
        sqlx::query("UPDATE users SET usage_count = usage_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete(&self, id: DbId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
