//! Error types for authentication and account management.

use crate::password::PasswordRule;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type for credential store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors reported by a [`CredentialStore`](crate::CredentialStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    #[error("email already exists: {0}")]
    DuplicateEmail(String),

    #[error("user not found: {0}")]
    NotFound(i64),

    /// The backing store could not be reached or failed internally.
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Authentication and account management errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The new password breaks a complexity rule.
    #[error("password does not meet complexity rules: {0}")]
    ComplexityViolation(#[from] PasswordRule),

    #[error("username already exists: {0}")]
    DuplicateUsername(String),

    #[error("email already exists: {0}")]
    DuplicateEmail(String),

    /// Wrong username or password with attempts left before lockout.
    #[error("invalid username or password, {remaining_attempts} attempts left")]
    InvalidCredentials { remaining_attempts: u32 },

    /// The current password given for a password change is wrong.
    #[error("current password is incorrect")]
    WrongPassword,

    /// Wrong username or password, and this failure engaged the lockout.
    #[error("invalid username or password, account locked for {} minutes", .lockout_secs / 60)]
    LockoutEngaged { lockout_secs: u64 },

    /// The account is locked; no credentials were checked.
    #[error("account is locked, try again in {}", format_remaining(*.remaining_secs))]
    LockedOut { remaining_secs: u64 },

    #[error("user not found: {0}")]
    NotFound(i64),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The credential store failed; never reported as bad credentials.
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Machine-checkable classification of an [`AuthError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorKind {
    ComplexityViolation,
    DuplicateUsername,
    DuplicateEmail,
    InvalidCredentials,
    LockedOut,
    NotFound,
    PermissionDenied,
    StoreUnavailable,
}

impl AuthError {
    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> AuthErrorKind {
        match self {
            Self::ComplexityViolation(_) => AuthErrorKind::ComplexityViolation,
            Self::DuplicateUsername(_) => AuthErrorKind::DuplicateUsername,
            Self::DuplicateEmail(_) => AuthErrorKind::DuplicateEmail,
            Self::InvalidCredentials { .. } | Self::WrongPassword => AuthErrorKind::InvalidCredentials,
            Self::LockoutEngaged { .. } | Self::LockedOut { .. } => AuthErrorKind::LockedOut,
            Self::NotFound(_) => AuthErrorKind::NotFound,
            Self::PermissionDenied(_) => AuthErrorKind::PermissionDenied,
            Self::StoreUnavailable(_) => AuthErrorKind::StoreUnavailable,
        }
    }

    /// Returns true if the account is (now) locked out.
    #[must_use]
    pub fn is_locked_out(&self) -> bool {
        self.kind() == AuthErrorKind::LockedOut
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUsername(u) => Self::DuplicateUsername(u),
            StoreError::DuplicateEmail(e) => Self::DuplicateEmail(e),
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
        }
    }
}

/// Formats a lockout remainder as `"9m 30s"`, or `"30s"` under a minute.
#[must_use]
pub fn format_remaining(secs: u64) -> String {
    let minutes = secs / 60;
    let seconds = secs % 60;
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
