/// Session Orchestration
///
/// Ties password verification, access tokens and refresh tokens together.
/// This is the only entry point request handlers use.
///
/// A refresh token lineage is Active until it either expires or is revoked,
/// and never comes back. Every login starts a new, independent lineage.

use std::sync::Arc;

use actix_web::http::header::HeaderMap;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::auth::credentials::get_bearer_token;
use crate::auth::jwt::{make_access_token, validate_access_token};
use crate::auth::password::PasswordHasher;
use crate::auth::refresh_token::{RefreshTokenStore, SessionState};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError};
use crate::storage::{Account, AccountRepository, RefreshTokenRepository};
use crate::validators::normalize_email;

/// Credentials handed out by a successful login
#[derive(Debug, Clone)]
pub struct Session {
    pub account: Account,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionService {
    accounts: Arc<dyn AccountRepository>,
    refresh_tokens: RefreshTokenStore,
    hasher: PasswordHasher,
    signing_secret: Arc<str>,
    access_token_lifetime: Duration,
}

impl SessionService {
    pub fn new(
        accounts: Arc<dyn AccountRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        settings: &AuthSettings,
    ) -> Self {
        Self {
            accounts,
            refresh_tokens: RefreshTokenStore::new(refresh_tokens, settings.refresh_token_lifetime()),
            hasher: PasswordHasher::new(settings.password_hash_cost),
            signing_secret: Arc::from(settings.secret.as_str()),
            access_token_lifetime: settings.access_token_lifetime(),
        }
    }

    /// Hasher configured for this service, for handlers that set passwords
    pub fn password_hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Authenticate by email and password and open a new session
    ///
    /// # Errors
    /// - `AuthError::InvalidCredentials` for an unknown email or a wrong
    ///   password, without saying which
    /// - storage errors are propagated
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = normalize_email(email);

        let account = match self.accounts.find_account_by_email(&email).await? {
            Some(account) => account,
            None => {
                tracing::warn!("Login attempt for unknown account");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        match self.hasher.verify(&account.password_hash, password) {
            Ok(()) => {}
            Err(AppError::Auth(_)) => {
                tracing::warn!(user_id = %account.id, "Login attempt with wrong password");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        }

        let access_token =
            make_access_token(account.id, &self.signing_secret, self.access_token_lifetime)?;
        let refresh_token = self.refresh_tokens.issue(account.id).await?;

        tracing::info!(user_id = %account.id, "User logged in");

        Ok(Session {
            account,
            access_token,
            refresh_token: refresh_token.token,
        })
    }

    /// Mint a new access token from a usable refresh token
    ///
    /// The refresh token itself is neither rotated nor extended.
    ///
    /// # Errors
    /// - `AuthError::RefreshTokenUnusable` if the token is unknown, expired
    ///   or revoked
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let record = match self.refresh_tokens.resolve(refresh_token).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                tracing::warn!("Refresh attempt with unknown token");
                return Err(AuthError::RefreshTokenUnusable.into());
            }
            Err(e) => return Err(e),
        };

        let state = record.state_at(Utc::now());
        if state != SessionState::Active {
            tracing::warn!(user_id = %record.user_id, state = ?state, "Refresh attempt with unusable token");
            return Err(AuthError::RefreshTokenUnusable.into());
        }

        let access_token =
            make_access_token(record.user_id, &self.signing_secret, self.access_token_lifetime)?;

        tracing::info!(user_id = %record.user_id, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke a refresh token
    ///
    /// Unknown, expired and already revoked tokens are a successful no-op.
    /// Only storage failures are reported.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), AppError> {
        let record = match self.refresh_tokens.resolve(refresh_token).await {
            Ok(record) => record,
            Err(e) if e.is_not_found() => {
                tracing::debug!("Revoke of unknown refresh token ignored");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if !record.is_usable_at(Utc::now()) {
            tracing::debug!(user_id = %record.user_id, "Revoke of unusable refresh token ignored");
            return Ok(());
        }

        match self.refresh_tokens.revoke(refresh_token).await {
            Ok(()) => {
                tracing::info!(user_id = %record.user_id, "Refresh token revoked");
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Authenticate a request by its bearer access token
    ///
    /// # Errors
    /// Any extraction or verification failure, as an `AuthError`
    pub fn require_auth(&self, headers: &HeaderMap) -> Result<Uuid, AppError> {
        let token = get_bearer_token(headers)?;
        let user_id = validate_access_token(token.as_str(), &self.signing_secret)?;
        Ok(user_id)
    }

    /// Verify a bare access token, as `require_auth` does after extraction
    pub fn verify_access_token(&self, token: &str) -> Result<Uuid, AppError> {
        Ok(validate_access_token(token, &self.signing_secret)?)
    }
}
