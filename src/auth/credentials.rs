/// Credential Extraction
///
/// Pulls credentials out of the `Authorization` header. The header must be
/// `<scheme> <credential>` separated by a single space. The scheme word is not
/// checked, so `Basic abc123` yields `abc123` just like `Bearer abc123`.
/// Anything after the credential word is ignored.

use actix_web::http::header::{HeaderMap, AUTHORIZATION};

use crate::error::AuthError;

/// Session credential presented as a bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Service API key presented in the same header shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Extract the bearer token from the `Authorization` header
///
/// # Errors
/// - `AuthError::MissingHeader` when the header is absent or empty
/// - `AuthError::MalformedHeader` when there is no credential word
pub fn get_bearer_token(headers: &HeaderMap) -> Result<BearerToken, AuthError> {
    credential_word(headers).map(|word| BearerToken(word.to_string()))
}

/// Extract a service API key from the `Authorization` header
///
/// Reserved for the service-key path (webhook callers), kept apart from
/// session bearer tokens.
///
/// # Errors
/// Same as [`get_bearer_token`]
pub fn get_api_key(headers: &HeaderMap) -> Result<ApiKey, AuthError> {
    credential_word(headers).map(|word| ApiKey(word.to_string()))
}

fn credential_word(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    if value.is_empty() {
        return Err(AuthError::MissingHeader);
    }

    let mut words = value.split(' ');
    let scheme = words.next().unwrap_or_default();
    match words.next() {
        Some(credential) if !scheme.is_empty() && !credential.is_empty() => Ok(credential),
        _ => Err(AuthError::MalformedHeader),
    }
}
