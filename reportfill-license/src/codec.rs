//! Claims serialization for activation codes.
//!
//! Claims are written as compact JSON with one- to three-letter keys and
//! then base64 encoded (standard alphabet, padded, no line wrapping):
//!
//! | key   | field          |
//! |-------|----------------|
//! | `v`   | version        |
//! | `exp` | expiry (unix seconds) |
//! | `d`   | validity days  |
//! | `u`   | subject label  |
//! | `m`   | machine bound  |
//! | `s`   | nonce          |
//! | `mid` | machine id (only when bound) |
//!
//! Decoding does not look at the signature or at any field's meaning.

use crate::error::{LicenseError, LicenseResult};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept from a subject label.
pub const MAX_SUBJECT_CHARS: usize = 20;

/// Length of the hex nonce embedded in every code.
pub const NONCE_HEX_LEN: usize = 8;

/// The claims embedded in an activation code.
///
/// Claims are never modified after issuance. Fields that an older or foreign
/// issuer may have left out decode to their defaults so that the semantic
/// checks in the service can report them precisely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseClaims {
    /// Issuer version literal.
    #[serde(rename = "v", default)]
    pub version: String,
    /// Expiry, seconds since the Unix epoch.
    #[serde(rename = "exp", default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    /// Number of days the code was issued for.
    #[serde(rename = "d", default)]
    pub validity_days: u32,
    /// Free-form label, at most [`MAX_SUBJECT_CHARS`] characters.
    #[serde(rename = "u", default)]
    pub subject_label: String,
    /// Whether the code is bound to a machine fingerprint.
    #[serde(rename = "m", default)]
    pub machine_bound: bool,
    /// Random hex so that identical inputs yield distinct codes.
    #[serde(rename = "s", default)]
    pub nonce: String,
    /// Fingerprint of the bound machine.
    #[serde(rename = "mid", default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
}

/// Truncates a subject label to [`MAX_SUBJECT_CHARS`] characters.
#[must_use]
pub fn truncate_subject(label: &str) -> String {
    label.chars().take(MAX_SUBJECT_CHARS).collect()
}

/// Encodes claims as base64 of their compact JSON form.
///
/// # Errors
///
/// Returns [`LicenseError::InvalidRequest`] if the claims cannot be
/// serialized.
pub fn encode(claims: &LicenseClaims) -> LicenseResult<String> {
    let json = serde_json::to_string(claims)
        .map_err(|e| LicenseError::InvalidRequest(format!("unserializable claims: {e}")))?;
    Ok(BASE64.encode(json.as_bytes()))
}

/// Decodes claims from base64 JSON.
///
/// # Errors
///
/// Returns [`LicenseError::Decode`] if the text is not valid base64, not
/// UTF-8, or not a claims object.
pub fn decode(text: &str) -> LicenseResult<LicenseClaims> {
    let bytes = BASE64
        .decode(text)
        .map_err(|e| LicenseError::Decode(format!("invalid base64: {e}")))?;
    let json = String::from_utf8(bytes)
        .map_err(|e| LicenseError::Decode(format!("payload is not UTF-8: {e}")))?;
    Ok(serde_json::from_str(&json)?)
}
