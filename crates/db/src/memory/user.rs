use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parlor_core::error::CoreError;
use parlor_core::types::{DbId, Timestamp};
use tokio::sync::RwLock;

use super::MemoryPersonaStore;
use crate::error::StoreResult;
use crate::models::user::{CreateUser, User};
use crate::stores::UserStore;

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<DbId, User>>,
    /// Personas owned by a deleted user go with it, as `ON DELETE CASCADE`
    /// does in PostgreSQL.
    personas: Option<Arc<MemoryPersonaStore>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose `delete` also removes the user's personas from `personas`.
    pub fn with_personas(personas: Arc<MemoryPersonaStore>) -> Self {
        Self {
            users: RwLock::default(),
            personas: Some(personas),
        }
    }

    async fn find_where(&self, pred: impl Fn(&User) -> bool + Send) -> Option<User> {
        self.users.read().await.values().find(|u| pred(u)).cloned()
    }

    /// Apply `f` to the user and return the updated copy.
    async fn modify(&self, id: DbId, f: impl FnOnce(&mut User) + Send) -> Option<User> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id)?;
        f(user);
        user.updated_at = Utc::now();
        Some(user.clone())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, input: &CreateUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == input.email) {
            return Err(CoreError::Conflict("Email is already registered".into()).into());
        }
        let now = Utc::now();
        let user = User {
            id: DbId::new_v4(),
            name: input.name.clone(),
            email: input.email.clone(),
            password_hash: input.password_hash.clone(),
            role: input.role.clone(),
            is_verified: false,
            verification_token: input.verification_token.clone(),
            reset_password_token: None,
            reset_password_expires: None,
            last_login_at: None,
            usage_count: 0,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: DbId) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.find_where(|u| u.email == email).await)
    }

    async fn find_by_verification_token(&self, token: &str) -> StoreResult<Option<User>> {
        Ok(self
            .find_where(|u| u.verification_token.as_deref() == Some(token))
            .await)
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: Timestamp,
    ) -> StoreResult<Option<User>> {
        Ok(self
            .find_where(|u| {
                u.reset_password_token.as_deref() == Some(token)
                    && u.reset_password_expires.is_some_and(|exp| exp > now)
            })
            .await)
    }

    async fn mark_verified(&self, id: DbId) -> StoreResult<bool> {
        let updated = self
            .modify(id, |u| {
                u.is_verified = true;
                u.verification_token = None;
            })
            .await;
        Ok(updated.is_some())
    }

    async fn record_login(&self, id: DbId) -> StoreResult<()> {
        self.modify(id, |u| u.last_login_at = Some(Utc::now())).await;
        Ok(())
    }

    async fn update_name(&self, id: DbId, name: &str) -> StoreResult<Option<User>> {
        let name = name.to_string();
        Ok(self.modify(id, move |u| u.name = name).await)
    }

    async fn set_reset_token(
        &self,
        id: DbId,
        token: &str,
        expires: Timestamp,
    ) -> StoreResult<()> {
        let token = token.to_string();
        self.modify(id, move |u| {
            u.reset_password_token = Some(token);
            u.reset_password_expires = Some(expires);
        })
        .await;
        Ok(())
    }

    async fn update_password(&self, id: DbId, password_hash: &str) -> StoreResult<bool> {
        let hash = password_hash.to_string();
        let updated = self
            .modify(id, move |u| {
                u.password_hash = hash;
                u.reset_password_token = None;
                u.reset_password_expires = None;
            })
            .await;
        Ok(updated.is_some())
    }

    async fn increment_usage(&self, id: DbId) -> StoreResult<()> {
        self.modify(id, |u| u.usage_count += 1).await;
        Ok(())
    }

    async fn delete(&self, id: DbId) -> StoreResult<bool> {
        let removed = self.users.write().await.remove(&id).is_some();
        if removed {
            if let Some(personas) = &self.personas {
                personas.remove_owned_by(id).await;
            }
        }
        Ok(removed)
    }
}
