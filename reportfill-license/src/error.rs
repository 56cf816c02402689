//! Error types for activation codes.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;

/// Reasons an activation code can be rejected, plus issuance and
/// configuration failures.
///
/// Verification stops at the first failing check, so a code only ever
/// reports one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LicenseError {
    /// The code does not split into exactly one payload and one signature.
    #[error("invalid activation code format: {0}")]
    Format(String),

    /// The payload is not valid base64 or not a valid claims object.
    #[error("activation code payload could not be decoded: {0}")]
    Decode(String),

    /// The signature does not match the payload.
    #[error("activation code signature verification failed")]
    Signature,

    /// The code was issued for a different license version.
    #[error("activation code version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: String, found: String },

    /// The claims carry no expiry timestamp.
    #[error("activation code has no expiry time")]
    MissingExpiry,

    /// The expiry timestamp is in the past.
    #[error("activation code expired at {}", format_expiry(*.expires_at))]
    Expired { expires_at: i64 },

    /// The code is bound to a different machine.
    #[error("activation code is bound to another machine")]
    MachineMismatch,

    /// The issue request itself is invalid.
    #[error("invalid issue request: {0}")]
    InvalidRequest(String),

    /// Missing or unusable configuration.
    #[error("license configuration error: {0}")]
    Config(String),
}

/// Machine-checkable classification of a [`LicenseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LicenseErrorKind {
    FormatError,
    DecodeError,
    SignatureError,
    VersionMismatch,
    MissingExpiry,
    Expired,
    MachineMismatch,
    InvalidRequest,
    Config,
}

impl LicenseError {
    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> LicenseErrorKind {
        match self {
            Self::Format(_) => LicenseErrorKind::FormatError,
            Self::Decode(_) => LicenseErrorKind::DecodeError,
            Self::Signature => LicenseErrorKind::SignatureError,
            Self::VersionMismatch { .. } => LicenseErrorKind::VersionMismatch,
            Self::MissingExpiry => LicenseErrorKind::MissingExpiry,
            Self::Expired { .. } => LicenseErrorKind::Expired,
            Self::MachineMismatch => LicenseErrorKind::MachineMismatch,
            Self::InvalidRequest(_) => LicenseErrorKind::InvalidRequest,
            Self::Config(_) => LicenseErrorKind::Config,
        }
    }
}

impl From<serde_json::Error> for LicenseError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

fn format_expiry(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}
