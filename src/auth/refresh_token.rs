/// Refresh Token Management
///
/// Refresh tokens are opaque, long-lived and stateful:
/// - 32 bytes from the OS random source, hex encoded (64 characters)
/// - persisted so they can be looked up and revoked
/// - never rotated or extended; a token lives until expiry or revocation
/// - revocation is soft, records are never deleted

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use uuid::Uuid;

use crate::error::{AppError, DatabaseError};
use crate::storage::{RefreshToken, RefreshTokenRepository};

const REFRESH_TOKEN_BYTES: usize = 32;

/// Lifecycle state of a refresh token at a given instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Active,
    Expired,
    Revoked,
}

impl RefreshToken {
    /// Revocation takes precedence over expiry
    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        if self.revoked_at.is_some() {
            SessionState::Revoked
        } else if now >= self.expires_at {
            SessionState::Expired
        } else {
            SessionState::Active
        }
    }

    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.state_at(now) == SessionState::Active
    }
}

/// Generate a new refresh token value
///
/// 256 bits of entropy, lowercase hex.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Issues, resolves and revokes persisted refresh tokens
#[derive(Clone)]
pub struct RefreshTokenStore {
    repository: Arc<dyn RefreshTokenRepository>,
    lifetime: Duration,
}

impl RefreshTokenStore {
    pub fn new(repository: Arc<dyn RefreshTokenRepository>, lifetime: Duration) -> Self {
        Self {
            repository,
            lifetime,
        }
    }

    /// Create and persist a fresh token for `user_id`
    ///
    /// # Errors
    /// Returns error if the expiry is not representable or the record cannot
    /// be stored
    pub async fn issue(&self, user_id: Uuid) -> Result<RefreshToken, AppError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.lifetime).ok_or_else(|| {
            AppError::Internal("Refresh token lifetime overflows the calendar".to_string())
        })?;
        let record = RefreshToken {
            token: generate_refresh_token(),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at,
            revoked_at: None,
        };

        self.repository.insert_refresh_token(&record).await?;
        tracing::debug!(user_id = %user_id, expires_at = %record.expires_at, "Refresh token issued");

        Ok(record)
    }

    /// Look up a token record without judging whether it is usable
    ///
    /// # Errors
    /// `DatabaseError::NotFound` when no record matches
    pub async fn resolve(&self, token: &str) -> Result<RefreshToken, AppError> {
        self.repository
            .find_refresh_token(token)
            .await?
            .ok_or_else(|| AppError::Database(DatabaseError::NotFound("refresh token".to_string())))
    }

    /// Mark a token revoked
    ///
    /// Revoking an already revoked token leaves its record unchanged.
    ///
    /// # Errors
    /// `DatabaseError::NotFound` when no record matches
    pub async fn revoke(&self, token: &str) -> Result<(), AppError> {
        self.repository
            .mark_refresh_token_revoked(token, Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn store(lifetime: Duration) -> RefreshTokenStore {
        RefreshTokenStore::new(Arc::new(InMemoryStore::new()), lifetime)
    }

    #[test]
    fn test_generate_refresh_token() {
        let token = generate_refresh_token();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_refresh_token(), generate_refresh_token());
    }

    #[test]
    fn test_state_transitions() {
        let now = Utc::now();
        let mut record = RefreshToken {
            token: generate_refresh_token(),
            user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(1),
            revoked_at: None,
        };

        assert_eq!(record.state_at(now), SessionState::Active);
        assert_eq!(record.state_at(record.expires_at), SessionState::Expired);

        record.revoked_at = Some(now);
        assert_eq!(record.state_at(now), SessionState::Revoked);
        assert!(!record.is_usable_at(now));
    }

    #[tokio::test]
    async fn test_issue_then_resolve() {
        let store = store(Duration::days(60));
        let user_id = Uuid::new_v4();

        let issued = store.issue(user_id).await.unwrap();
        let resolved = store.resolve(&issued.token).await.unwrap();

        assert_eq!(resolved, issued);
        assert_eq!(resolved.user_id, user_id);
        assert!(resolved.revoked_at.is_none());
        assert_eq!(resolved.created_at, resolved.updated_at);

        let expected = Utc::now() + Duration::days(60);
        let drift = (resolved.expires_at - expected).num_seconds().abs();
        assert!(drift <= 5, "expires_at off by {}s", drift);
    }

    #[tokio::test]
    async fn test_resolve_unknown_token() {
        let store = store(Duration::days(60));
        let result = store.resolve(&generate_refresh_token()).await;

        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_does_not_judge_expiry() {
        let store = store(Duration::seconds(-1));
        let issued = store.issue(Uuid::new_v4()).await.unwrap();

        let resolved = store.resolve(&issued.token).await.unwrap();
        assert_eq!(resolved.state_at(Utc::now()), SessionState::Expired);
    }

    #[tokio::test]
    async fn test_revoke_sets_timestamps() {
        let store = store(Duration::days(60));
        let issued = store.issue(Uuid::new_v4()).await.unwrap();

        store.revoke(&issued.token).await.unwrap();
        let revoked = store.resolve(&issued.token).await.unwrap();

        let revoked_at = revoked.revoked_at.expect("revoked_at must be set");
        assert_eq!(revoked.updated_at, revoked_at);
        assert!(revoked_at >= issued.created_at);
    }

    #[tokio::test]
    async fn test_revoke_twice_keeps_state() {
        let store = store(Duration::days(60));
        let issued = store.issue(Uuid::new_v4()).await.unwrap();

        store.revoke(&issued.token).await.unwrap();
        let first = store.resolve(&issued.token).await.unwrap();
        store.revoke(&issued.token).await.unwrap();
        let second = store.resolve(&issued.token).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_revoke_unknown_token() {
        let store = store(Duration::days(60));
        let result = store.revoke("does-not-exist").await;

        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry_is_an_error() {
        let store = store(Duration::days(1_000_000_000));
        let result = store.issue(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
