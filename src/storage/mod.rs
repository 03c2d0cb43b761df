/// Storage collaborator
///
/// Accounts and refresh tokens are persisted behind two narrow traits so the
/// session core can run against Postgres in production and an in-memory map
/// in tests.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

/// A user account as the core sees it
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted refresh token record
///
/// Usable iff `revoked_at` is unset and `now < expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Account persistence owned by the user-storage collaborator
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Look up an account by its (already normalized) email
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError>;

    /// # Errors
    /// `DatabaseError::UniqueConstraintViolation` if the email is taken
    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account, AppError>;

    /// Replace email and password hash of an existing account
    ///
    /// # Errors
    /// `DatabaseError::NotFound` if no account has this id
    async fn update_account(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, AppError>;
}

/// Refresh token persistence
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn insert_refresh_token(&self, record: &RefreshToken) -> Result<(), AppError>;

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError>;

    /// Atomically set `revoked_at` (first revocation wins) and `updated_at`
    ///
    /// # Errors
    /// `DatabaseError::NotFound` if no record matches `token`
    async fn mark_refresh_token_revoked(
        &self,
        token: &str,
        when: DateTime<Utc>,
    ) -> Result<(), AppError>;
}
