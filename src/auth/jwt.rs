/// Access Token Generation and Validation
///
/// Access tokens are stateless HS256 JWTs. Nothing is stored server side, so
/// a token stays valid until `exp` no matter what happens to the session that
/// minted it.

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{Claims, ISSUER};
use crate::error::{AppError, AuthError};

/// Sign a new access token for `user_id`
///
/// # Arguments
/// * `user_id` - Account the token acts as
/// * `secret` - HMAC signing secret
/// * `lifetime` - Time until expiry; negative values yield an already expired token
///
/// # Errors
/// Returns error if token encoding fails
pub fn make_access_token(
    user_id: Uuid,
    secret: &str,
    lifetime: Duration,
) -> Result<String, AppError> {
    let claims = Claims::new(user_id, lifetime);

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Verify an access token and return the account it acts as
///
/// The signature is verified before any claim is looked at.
///
/// # Errors
/// - `AuthError::InvalidSignature` for a wrong secret, algorithm or issuer
/// - `AuthError::TokenExpired` once `exp` has been reached
/// - `AuthError::MalformedToken` when the token or its subject cannot be parsed
pub fn validate_access_token(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm | ErrorKind::InvalidIssuer => {
                AuthError::InvalidSignature
            }
            _ => AuthError::MalformedToken,
        }
    })?;

    // jsonwebtoken still accepts a token in its exact `exp` second
    if claims.is_expired() {
        return Err(AuthError::TokenExpired);
    }

    claims.user_id()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-characters-long";

    fn sign(claims: &Claims, algorithm: Algorithm) -> String {
        encode(
            &Header::new(algorithm),
            claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_generate_and_validate_token() {
        let user_id = Uuid::new_v4();

        let token = make_access_token(user_id, SECRET, Duration::hours(1))
            .expect("Failed to generate token");
        let subject = validate_access_token(&token, SECRET).expect("Failed to validate token");

        assert_eq!(subject, user_id);
    }

    #[test]
    fn test_validation_is_repeatable() {
        let user_id = Uuid::new_v4();
        let token = make_access_token(user_id, SECRET, Duration::hours(1)).unwrap();

        assert_eq!(validate_access_token(&token, SECRET), Ok(user_id));
        assert_eq!(validate_access_token(&token, SECRET), Ok(user_id));
    }

    #[test]
    fn test_wrong_secret() {
        let token = make_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();
        let result = validate_access_token(&token, "wrong-secret");

        assert_eq!(result, Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_expired_token() {
        let token = make_access_token(Uuid::new_v4(), SECRET, Duration::hours(-1)).unwrap();
        let result = validate_access_token(&token, SECRET);

        assert_eq!(result, Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_zero_lifetime_is_expired() {
        let token = make_access_token(Uuid::new_v4(), SECRET, Duration::zero()).unwrap();
        assert_eq!(validate_access_token(&token, SECRET), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_expired_token_with_wrong_secret_fails_on_signature() {
        let token = make_access_token(Uuid::new_v4(), SECRET, Duration::hours(-1)).unwrap();
        let result = validate_access_token(&token, "wrong-secret");

        assert_eq!(result, Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_invalid_token() {
        let result = validate_access_token("invalid.token.here", SECRET);
        assert_eq!(result, Err(AuthError::MalformedToken));
    }

    #[test]
    fn test_tampered_token() {
        let token = make_access_token(Uuid::new_v4(), SECRET, Duration::hours(1)).unwrap();

        let tampered = format!("{}X", token);
        assert!(validate_access_token(&tampered, SECRET).is_err());
    }

    #[test]
    fn test_subject_must_be_uuid() {
        let mut claims = Claims::new(Uuid::new_v4(), Duration::hours(1));
        claims.sub = "not-a-uuid".to_string();
        let token = sign(&claims, Algorithm::HS256);

        assert_eq!(validate_access_token(&token, SECRET), Err(AuthError::MalformedToken));
    }

    #[test]
    fn test_wrong_issuer() {
        let mut claims = Claims::new(Uuid::new_v4(), Duration::hours(1));
        claims.iss = "someone-else".to_string();
        let token = sign(&claims, Algorithm::HS256);

        assert_eq!(validate_access_token(&token, SECRET), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn test_algorithm_mismatch() {
        let claims = Claims::new(Uuid::new_v4(), Duration::hours(1));
        let token = sign(&claims, Algorithm::HS512);

        assert_eq!(validate_access_token(&token, SECRET), Err(AuthError::InvalidSignature));
    }
}
