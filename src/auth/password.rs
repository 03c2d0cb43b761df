/// Password Hashing and Verification
///
/// bcrypt with a per-hash random salt. The cost factor is injected so tests
/// and development setups can trade strength for speed.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::{AppError, AuthError, ValidationError};

const MIN_PASSWORD_LENGTH: usize = 8;
/// bcrypt only reads the first 72 bytes
const MAX_PASSWORD_LENGTH: usize = 72;

/// One-way password hasher
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a password with a fresh random salt
    ///
    /// # Errors
    /// - `ValidationError::TooLong` for passwords over 72 bytes, which bcrypt
    ///   would silently truncate
    /// - `AppError::Internal` when the configured cost is outside what bcrypt
    ///   accepts
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH).into());
        }

        hash(password, self.cost)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Verify a password against a stored hash
    ///
    /// The comparison is constant time with respect to the hash's own salt.
    ///
    /// # Errors
    /// - `AuthError::PasswordMismatch` when the password does not match
    /// - `AppError::Internal` when the stored hash cannot be parsed
    pub fn verify(&self, hash: &str, password: &str) -> Result<(), AppError> {
        // Stored hashes never cover more than 72 bytes, so a longer input
        // cannot be the password even if its prefix matches.
        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(AppError::Auth(AuthError::PasswordMismatch));
        }

        let matches = verify(password, hash).map_err(|e| {
            tracing::error!("Stored password hash is unusable: {}", e);
            AppError::Internal(format!("Password verification failed: {}", e))
        })?;

        if matches {
            Ok(())
        } else {
            Err(AppError::Auth(AuthError::PasswordMismatch))
        }
    }
}

/// Validate password strength requirements for new credentials
///
/// Requirements:
/// - 8 to 72 bytes
/// - At least one digit
/// - At least one lowercase letter
/// - At least one uppercase letter
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort("password", MIN_PASSWORD_LENGTH));
    }

    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH));
    }

    let has_digit = password.chars().any(|c| c.is_numeric());
    let has_lowercase = password.chars().any(|c| c.is_lowercase());
    let has_uppercase = password.chars().any(|c| c.is_uppercase());

    if !has_digit || !has_lowercase || !has_uppercase {
        return Err(ValidationError::WeakPassword);
    }

    Ok(())
}
