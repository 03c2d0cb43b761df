/// Input validators for account credentials
///
/// Emails are compared case-insensitively, so every email that reaches
/// storage goes through `normalize_email` first.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;
const MAX_LOCAL_PART_LENGTH: usize = 64;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");
}

/// Canonical form used for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates an email address and returns its normalized form
/// - Checks length constraints
/// - Checks format using RFC 5322 simplified regex
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let normalized = normalize_email(email);

    if normalized.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }

    if normalized.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH));
    }

    if normalized.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }

    if !EMAIL_REGEX.is_match(&normalized) {
        return Err(ValidationError::InvalidFormat("email"));
    }

    if let Some(at_pos) = normalized.find('@') {
        if at_pos > MAX_LOCAL_PART_LENGTH {
            return Err(ValidationError::InvalidFormat("email"));
        }
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(is_valid_email("user@example.com").is_ok());
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_email_is_normalized() {
        assert_eq!(is_valid_email("  Walt@Breakingbad.COM ").unwrap(), "walt@breakingbad.com");
        assert_eq!(normalize_email("A@B.C"), "a@b.c");
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
        assert!(is_valid_email("").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(is_valid_email(&long_local).is_err());
    }
}
