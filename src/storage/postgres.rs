use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Account, AccountRepository, RefreshToken, RefreshTokenRepository};
use crate::error::{AppError, DatabaseError};

/// Postgres-backed store, schema in `migrations/`
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresStore {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn find_account_by_id(&self, id: Uuid) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT id, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account, AppError> {
        let now = Utc::now();
        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO users (id, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    async fn update_account(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &str,
    ) -> Result<Account, AppError> {
        sqlx::query_as::<_, Account>(
            r#"
            UPDATE users
            SET email = $1, password_hash = $2, updated_at = $3
            WHERE id = $4
            RETURNING id, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::Database(DatabaseError::NotFound("account".to_string())))
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresStore {
    async fn insert_refresh_token(&self, record: &RefreshToken) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token, user_id, created_at, updated_at, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&record.token)
        .bind(record.user_id)
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.expires_at)
        .bind(record.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, AppError> {
        let record = sqlx::query_as::<_, RefreshToken>(
            r#"
            SELECT token, user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn mark_refresh_token_revoked(
        &self,
        token: &str,
        when: DateTime<Utc>,
    ) -> Result<(), AppError> {
        // Single-row UPDATE: the row lock serializes concurrent revocations,
        // and an existing revoked_at is never overwritten.
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = COALESCE(revoked_at, $1),
                updated_at = CASE WHEN revoked_at IS NULL THEN $1 ELSE updated_at END
            WHERE token = $2
            "#,
        )
        .bind(when)
        .bind(token)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Database(DatabaseError::NotFound(
                "refresh token".to_string(),
            )));
        }

        Ok(())
    }
}
