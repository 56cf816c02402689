//! Activation codes for ReportFill.
//!
//! This crate handles:
//! - Serializing license claims into a compact, text-safe payload
//! - HMAC signatures over that payload with a shared secret
//! - Host fingerprinting for optional machine binding
//! - Issuing, verifying and inspecting dash-grouped activation codes
//!
//! # Code Format
//!
//! Codes are formatted as `base64(json).hex_signature`, split into groups of
//! six characters joined by `-`. Codes are self-contained: nothing is stored
//! on issuance and verification needs only the secret and the clock.
//!
//! # Trust
//!
//! [`LicenseService::verify`] is the only path that yields trusted claims
//! ([`VerifiedLicense`]). [`LicenseService::inspect`] returns
//! [`UntrustedClaims`] for diagnostics and must never gate access.

mod codec;
mod config;
mod error;
mod fingerprint;
mod service;
mod signature;

pub use codec::{decode, encode, truncate_subject, LicenseClaims, MAX_SUBJECT_CHARS, NONCE_HEX_LEN};
pub use config::{
    LicenseConfig, SigningSecret, DEFAULT_LICENSE_VERSION, SECRET_ENV, VERSION_ENV,
};
pub use error::{LicenseError, LicenseErrorKind, LicenseResult};
pub use fingerprint::{FingerprintSource, HostAttributes, HostFingerprint, MACHINE_ID_HEX_LEN};
pub use service::{
    strip_grouping, LicenseService, UntrustedClaims, VerifiedLicense, GROUP_SEPARATOR, GROUP_WIDTH,
    PAYLOAD_SEPARATOR,
};
pub use signature::{SignatureEngine, SIGNATURE_HEX_LEN};
