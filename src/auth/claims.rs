/// JWT Claims structure
///
/// Payload of an access token: the acting account plus the standard
/// registered claims (RFC 7519).

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Fixed issuer for every access token this service signs
pub const ISSUER: &str = "chirpy";

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Issuer
    pub iss: String,
    /// Subject (account ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create claims for `user_id` valid for `lifetime` from now
    pub fn new(user_id: Uuid, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            iss: ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + lifetime).timestamp(),
        }
    }

    /// Extract the account ID from the subject claim
    ///
    /// # Errors
    /// Returns `AuthError::MalformedToken` if the subject is not a UUID
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::MalformedToken)
    }

    /// A token is expired from the second `exp` is reached
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Duration::hours(1));

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, 3600);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Duration::hours(1));

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = Claims::new(Uuid::new_v4(), Duration::hours(1));
        claims.sub = "invalid-uuid".to_string();

        assert_eq!(claims.user_id(), Err(AuthError::MalformedToken));
    }

    #[test]
    fn test_negative_lifetime_is_expired() {
        let claims = Claims::new(Uuid::new_v4(), Duration::hours(-1));
        assert!(claims.is_expired());
    }
}
