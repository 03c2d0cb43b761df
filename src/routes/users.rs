/// Account Routes
///
/// Creating an account and changing the credentials of the acting account.

use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{validate_password_strength, SessionService};
use crate::error::{AppError, ErrorContext};
use crate::middleware::AuthenticatedUser;
use crate::storage::{Account, AccountRepository};
use crate::validators::is_valid_email;

/// Email and password, for both creation and update
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

/// Public view of an account; the password hash never leaves the server
#[derive(Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
}

impl From<Account> for UserResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            created_at: account.created_at,
            updated_at: account.updated_at,
            email: account.email,
        }
    }
}

/// POST /api/users
///
/// # Validation
/// - Email must be valid; it is stored lower-cased
/// - Password must be 8-72 bytes with digit, lowercase and uppercase
///
/// # Errors
/// - 400: Validation errors
/// - 409: Email already registered
pub async fn create_user(
    form: web::Json<CredentialsRequest>,
    accounts: web::Data<dyn AccountRepository>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("create_user");

    let email = is_valid_email(&form.email)?;
    validate_password_strength(&form.password)?;
    let password_hash = sessions.password_hasher().hash(&form.password)?;

    let account = accounts.create_account(&email, &password_hash).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %account.id,
        "User created"
    );

    Ok(HttpResponse::Created().json(UserResponse::from(account)))
}

/// PUT /api/users
///
/// Requires `Authorization: Bearer <access_token>`; claims are injected by
/// `RequireAuth`.
///
/// # Errors
/// - 400: Validation errors
/// - 401: Missing or invalid access token (handled by middleware)
/// - 404: Account no longer exists
/// - 409: Email already used by another account
pub async fn update_user(
    user: web::ReqData<AuthenticatedUser>,
    form: web::Json<CredentialsRequest>,
    accounts: web::Data<dyn AccountRepository>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let AuthenticatedUser(user_id) = user.into_inner();
    let context = ErrorContext::new("update_user").with_user_id(user_id.to_string());

    let email = is_valid_email(&form.email)?;
    validate_password_strength(&form.password)?;
    let password_hash = sessions.password_hasher().hash(&form.password)?;

    let account = accounts
        .update_account(user_id, &email, &password_hash)
        .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = ?context.user_id,
        "User credentials updated"
    );

    Ok(HttpResponse::Ok().json(UserResponse::from(account)))
}
