use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Account, AccountRepository, RefreshToken, RefreshTokenRepository};
use crate::error::{AppError, DatabaseError};

/// Process-local store for tests and `database.in_memory = true`
///
/// Every operation runs inside one critical section, which gives the same
/// per-record atomicity as a single-row `UPDATE`.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    accounts: Arc<Mutex<HashMap<Uuid, Account>>>,
    refresh_tokens: Arc<Mutex<HashMap<String, RefreshToken>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::Database(DatabaseError::UnexpectedError("store lock poisoned".to_string())))
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let accounts = lock(&self.accounts)?;
        Ok(accounts.values().find(|a| a.email == email).cloned())
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let accounts = lock(&self.accounts)?;
        Ok(accounts.get(&id).cloned())
    }

    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account, AppError> {
        let mut accounts = lock(&self.accounts)?;
        if accounts.values().any(|a| a.email == email) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            )));
        }

        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        };
        accounts.insert(account.id, account.clone());
        Ok(account)
    }

    async fn update_account(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, AppError> {
        let mut accounts = lock(&self.accounts)?;
        if accounts.values().any(|a| a.email == email && a.id != id) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "Email already registered".to_string(),
            )));
        }

        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| AppError::Database(DatabaseError::NotFound("account".to_string())))?;
        account.email = email.to_string();
        account.password_hash = password_hash.to_string();
        account.updated_at = Utc::now();
        Ok(account.clone())
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryStore {
    async fn insert_refresh_token(&self, record: &RefreshToken) -> Result<(), AppError> {
        let mut tokens = lock(&self.refresh_tokens)?;
        if tokens.contains_key(&record.token) {
            return Err(AppError::Database(DatabaseError::UniqueConstraintViolation(
                "refresh token".to_string(),
            )));
        }
        tokens.insert(record.token.clone(), record.clone());
        Ok(())
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        let tokens = lock(&self.refresh_tokens)?;
        Ok(tokens.get(token).cloned())
    }

    async fn mark_refresh_token_revoked(
        &self,
        token: &str,
        when: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut tokens = lock(&self.refresh_tokens)?;
        let record = tokens
            .get_mut(token)
            .ok_or_else(|| AppError::Database(DatabaseError::NotFound("refresh token".to_string())))?;

        if record.revoked_at.is_none() {
            record.revoked_at = Some(when);
            record.updated_at = when;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(token: &str) -> RefreshToken {
        let now = Utc::now();
        RefreshToken {
            token: token.to_string(),
            user_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            expires_at: now + Duration::days(60),
            revoked_at: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let store = InMemoryStore::new();
        store.create_account("a@example.com", "hash").await.unwrap();

        let result = store.create_account("a@example.com", "hash").await;
        assert!(matches!(
            result,
            Err(AppError::Database(DatabaseError::UniqueConstraintViolation(_)))
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_account() {
        let store = InMemoryStore::new();
        let result = store.update_account(Uuid::new_v4(), "a@example.com", "hash").await;
        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_first_revocation_wins() {
        let store = InMemoryStore::new();
        store.insert_refresh_token(&record("abc")).await.unwrap();

        let first = Utc::now();
        store.mark_refresh_token_revoked("abc", first).await.unwrap();
        store
            .mark_refresh_token_revoked("abc", first + Duration::minutes(5))
            .await
            .unwrap();

        let stored = store.find_refresh_token("abc").await.unwrap().unwrap();
        assert_eq!(stored.revoked_at, Some(first));
        assert_eq!(stored.updated_at, first);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_revocations_keep_a_single_timestamp() {
        let store = InMemoryStore::new();
        store.insert_refresh_token(&record("abc")).await.unwrap();

        let base = Utc::now();
        let attempts: Vec<_> = (0..32)
            .map(|i| base + Duration::seconds(i))
            .collect();
        let handles = attempts.iter().map(|when| {
            let store = store.clone();
            let when = *when;
            tokio::spawn(async move { store.mark_refresh_token_revoked("abc", when).await })
        });
        for result in futures::future::join_all(handles).await {
            assert!(result.unwrap().is_ok());
        }

        let stored = store.find_refresh_token("abc").await.unwrap().unwrap();
        let revoked_at = stored.revoked_at.expect("token must be revoked");
        assert!(attempts.contains(&revoked_at));
        assert_eq!(stored.updated_at, revoked_at);

        store
            .mark_refresh_token_revoked("abc", base + Duration::days(1))
            .await
            .unwrap();
        let again = store.find_refresh_token("abc").await.unwrap().unwrap();
        assert_eq!(again.revoked_at, Some(revoked_at));
    }

    #[tokio::test]
    async fn test_revoking_unknown_token_is_not_found() {
        let store = InMemoryStore::new();
        let result = store.mark_refresh_token_revoked("missing", Utc::now()).await;
        assert!(result.unwrap_err().is_not_found());
    }
}
