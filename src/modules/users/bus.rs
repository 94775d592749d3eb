use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use roster_core::{OrderBy, Page, hash_password_with_cost, verify_password};
use roster_models::{NewUser, QueryFilter, UpdateUser, User, UserOrderField};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// bcrypt's default work factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("email already in use")]
    DuplicatedEmail,
    #[error("user not found")]
    NotFound,
    #[error("authentication failed")]
    AuthenticationFailed,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Persistence for users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: &User) -> Result<(), UserError>;
    async fn update(&self, user: &User) -> Result<(), UserError>;
    async fn delete(&self, user: &User) -> Result<(), UserError>;
    async fn query(
        &self,
        filter: &QueryFilter,
        order: &OrderBy<UserOrderField>,
        page: &Page,
    ) -> Result<Vec<User>, UserError>;
    async fn count(&self, filter: &QueryFilter) -> Result<i64, UserError>;
    async fn query_by_id(&self, id: Uuid) -> Result<User, UserError>;
    async fn query_by_email(&self, email: &str) -> Result<User, UserError>;
}

/// Business operations on users.
#[derive(Clone)]
pub struct UserBus {
    store: Arc<dyn UserStore>,
    bcrypt_cost: u32,
}

impl UserBus {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    #[instrument(name = "user.bus.create", skip_all)]
    pub async fn create(&self, nu: NewUser) -> Result<User, UserError> {
        let password_hash = self.hash(nu.password).await?;
        let now = now();

        let user = User {
            id: Uuid::new_v4(),
            name: nu.name,
            email: nu.email,
            roles: nu.roles,
            password_hash,
            department: nu.department,
            enabled: true,
            created_at: now,
            updated_at: now,
        };

        self.store.create(&user).await?;

        Ok(user)
    }

    /// Applies the `Some` fields of `uu` to `user`.
    #[instrument(name = "user.bus.update", skip_all, fields(user_id = %user.id))]
    pub async fn update(&self, mut user: User, uu: UpdateUser) -> Result<User, UserError> {
        if let Some(name) = uu.name {
            user.name = name;
        }
        if let Some(email) = uu.email {
            user.email = email;
        }
        if let Some(roles) = uu.roles {
            user.roles = roles;
        }
        if let Some(department) = uu.department {
            user.department = department;
        }
        if let Some(password) = uu.password {
            user.password_hash = self.hash(password).await?;
        }
        if let Some(enabled) = uu.enabled {
            user.enabled = enabled;
        }
        user.updated_at = now();

        self.store.update(&user).await?;

        Ok(user)
    }

    #[instrument(name = "user.bus.delete", skip_all, fields(user_id = %user.id))]
    pub async fn delete(&self, user: &User) -> Result<(), UserError> {
        self.store.delete(user).await
    }

    #[instrument(name = "user.bus.query", skip_all)]
    pub async fn query(
        &self,
        filter: &QueryFilter,
        order: &OrderBy<UserOrderField>,
        page: &Page,
    ) -> Result<Vec<User>, UserError> {
        self.store.query(filter, order, page).await
    }

    #[instrument(name = "user.bus.count", skip_all)]
    pub async fn count(&self, filter: &QueryFilter) -> Result<i64, UserError> {
        self.store.count(filter).await
    }

    #[instrument(name = "user.bus.query_by_id", skip(self))]
    pub async fn query_by_id(&self, id: Uuid) -> Result<User, UserError> {
        self.store.query_by_id(id).await
    }

    #[instrument(name = "user.bus.query_by_email", skip_all)]
    pub async fn query_by_email(&self, email: &str) -> Result<User, UserError> {
        self.store.query_by_email(email).await
    }

    /// Checks `password` against the stored hash for `email`.
    ///
    /// Unknown emails and wrong passwords both fail with
    /// [`UserError::AuthenticationFailed`].
    #[instrument(name = "user.bus.authenticate", skip_all)]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserError> {
        let user = match self.store.query_by_email(email).await {
            Ok(user) => user,
            Err(UserError::NotFound) => return Err(UserError::AuthenticationFailed),
            Err(e) => return Err(e),
        };

        let password = password.to_string();
        let hash = user.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(anyhow::Error::from)?
            .map_err(|e| UserError::Store(e.error))?;

        if !matches {
            return Err(UserError::AuthenticationFailed);
        }

        Ok(user)
    }

    async fn hash(&self, password: String) -> Result<String, UserError> {
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash_password_with_cost(&password, cost))
            .await
            .map_err(anyhow::Error::from)?
            .map_err(|e| UserError::Store(e.error))
    }
}

/// Postgres keeps microseconds, so timestamps are truncated before they are
/// stored or returned.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
