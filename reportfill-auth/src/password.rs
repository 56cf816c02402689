//! Password complexity rules and hashing.

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Minimum password length in characters.
pub const MIN_PASSWORD_CHARS: usize = 8;

/// Characters that satisfy the special-character rule.
pub const SPECIAL_CHARS: &str = r#"!@#$%^&*(),.?":{}|<>"#;

/// A complexity rule a password failed, in the order rules are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PasswordRule {
    #[error("password must be at least 8 characters long")]
    MinLength,

    #[error("password must contain an uppercase letter")]
    Uppercase,

    #[error("password must contain a lowercase letter")]
    Lowercase,

    #[error("password must contain a digit")]
    Digit,

    #[error("password must contain a special character (!@#$%^&* etc.)")]
    Special,
}

/// Checks a password against the complexity rules.
///
/// Rules are checked in a fixed order (length, uppercase, lowercase, digit,
/// special character) and the first one that fails is returned.
///
/// # Errors
///
/// Returns the first [`PasswordRule`] the password breaks.
pub fn validate_password_complexity(password: &str) -> Result<(), PasswordRule> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(PasswordRule::MinLength);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(PasswordRule::Uppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(PasswordRule::Lowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordRule::Digit);
    }
    if !password.chars().any(|c| SPECIAL_CHARS.contains(c)) {
        return Err(PasswordRule::Special);
    }
    Ok(())
}

/// Hashes a password as lowercase hex SHA-256.
///
/// This is the unsalted digest existing account databases were written
/// with, kept for compatibility.
#[must_use]
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
