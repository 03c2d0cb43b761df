/// Session Routes
///
/// Login, access token refresh and refresh token revocation.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{get_bearer_token, SessionService};
use crate::error::{AppError, ErrorContext};

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful login: the account plus both tokens
#[derive(Serialize)]
pub struct LoginResponse {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
}

/// Freshly minted access token
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// POST /api/login
///
/// # Errors
/// - 400: Missing fields
/// - 401: Unknown email or wrong password (indistinguishable)
/// - 5xx: Storage failure
pub async fn login(
    form: web::Json<LoginRequest>,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("login");

    let session = sessions.login(&form.email, &form.password).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %session.account.id,
        "Session opened"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        id: session.account.id,
        created_at: session.account.created_at,
        updated_at: session.account.updated_at,
        email: session.account.email,
        token: session.access_token,
        refresh_token: session.refresh_token,
    }))
}

/// POST /api/refresh
///
/// Takes the refresh token as `Authorization: Bearer <refresh_token>`.
/// The refresh token stays valid; only a new access token is returned.
///
/// # Errors
/// - 401: Missing header, or unknown / expired / revoked refresh token
pub async fn refresh(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = get_bearer_token(req.headers())?;
    let token = sessions.refresh(refresh_token.as_str()).await?;

    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

/// POST /api/revoke
///
/// Takes the refresh token as `Authorization: Bearer <refresh_token>`.
/// Always 204 once a token was presented, whether or not it was still active.
///
/// # Errors
/// - 401: Missing or malformed header
/// - 5xx: Storage failure
pub async fn revoke(
    req: HttpRequest,
    sessions: web::Data<SessionService>,
) -> Result<HttpResponse, AppError> {
    let refresh_token = get_bearer_token(req.headers())?;
    sessions.revoke(refresh_token.as_str()).await?;

    Ok(HttpResponse::NoContent().finish())
}
