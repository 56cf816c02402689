//! Activation code issuance, verification and inspection.
//!
//! Wire format:
//!
//! ```text
//! base64(compact_json(claims)) + "." + hmac_sha256_hex[..16]
//! ```
//!
//! regrouped into 6-character groups joined by `-`. The grouping is
//! cosmetic; every `-` is removed before a code is parsed.

use crate::codec::{self, LicenseClaims};
use crate::config::LicenseConfig;
use crate::error::{LicenseError, LicenseResult};
use crate::fingerprint::{FingerprintSource, HostFingerprint, MACHINE_ID_HEX_LEN};
use crate::signature::SignatureEngine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Width of each dash-separated group in a formatted code.
pub const GROUP_WIDTH: usize = 6;

/// Separator between groups in a formatted code.
pub const GROUP_SEPARATOR: char = '-';

/// Separator between payload and signature.
pub const PAYLOAD_SEPARATOR: char = '.';

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Claims of a code that passed every verification check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedLicense {
    pub version: String,
    pub expires_at: DateTime<Utc>,
    pub validity_days: u32,
    pub subject_label: String,
    pub machine_bound: bool,
    pub nonce: String,
    pub machine_id: Option<String>,
}

/// Claims read from a code without checking its signature or expiry.
///
/// Nothing in here is trustworthy. Use [`LicenseService::verify`] to decide
/// whether a code is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UntrustedClaims {
    claims: LicenseClaims,
    expires_at: DateTime<Utc>,
}

impl UntrustedClaims {
    /// Decodes the claims of a code without a secret.
    ///
    /// Returns `None` if the code is malformed or carries no expiry.
    #[must_use]
    pub fn read(code: &str) -> Option<Self> {
        let clean = strip_grouping(code);
        let (payload, _) = split_code(&clean).ok()?;
        let claims = codec::decode(payload).ok()?;
        let expires_at = claims
            .expires_at
            .filter(|exp| *exp != 0)
            .and_then(|exp| DateTime::from_timestamp(exp, 0))?;
        Some(Self { claims, expires_at })
    }

    /// Returns the raw decoded claims.
    #[must_use]
    pub fn claims(&self) -> &LicenseClaims {
        &self.claims
    }

    /// Returns the claimed expiry.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

/// Issues and checks activation codes.
///
/// The service holds no mutable state and can be shared freely between
/// threads.
#[derive(Clone)]
pub struct LicenseService {
    signer: SignatureEngine,
    version: String,
    fingerprint: Arc<dyn FingerprintSource>,
}

impl std::fmt::Debug for LicenseService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LicenseService")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl LicenseService {
    /// Creates a service that binds codes to the current host.
    #[must_use]
    pub fn new(config: LicenseConfig) -> Self {
        Self::with_fingerprint(config, Arc::new(HostFingerprint))
    }

    /// Creates a service with a custom fingerprint source.
    #[must_use]
    pub fn with_fingerprint(config: LicenseConfig, fingerprint: Arc<dyn FingerprintSource>) -> Self {
        Self {
            signer: SignatureEngine::new(config.secret),
            version: config.version,
            fingerprint,
        }
    }

    /// Returns the version literal this service issues and accepts.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the machine id of the current host.
    #[must_use]
    pub fn machine_id(&self) -> String {
        self.fingerprint
            .current_id()
            .chars()
            .take(MACHINE_ID_HEX_LEN)
            .collect()
    }

    /// Issues a new activation code valid for `validity_days` from now.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidRequest`] if `validity_days` is zero.
    pub fn issue(&self, validity_days: u32, subject_label: &str, bind_machine: bool) -> LicenseResult<String> {
        self.issue_at(validity_days, subject_label, bind_machine, Utc::now().timestamp())
    }

    /// Issues a new activation code as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidRequest`] if `validity_days` is zero.
    pub fn issue_at(
        &self,
        validity_days: u32,
        subject_label: &str,
        bind_machine: bool,
        now: i64,
    ) -> LicenseResult<String> {
        if validity_days == 0 {
            return Err(LicenseError::InvalidRequest(
                "validity days must be greater than zero".into(),
            ));
        }

        let claims = LicenseClaims {
            version: self.version.clone(),
            expires_at: Some(now + i64::from(validity_days) * SECS_PER_DAY),
            validity_days,
            subject_label: codec::truncate_subject(subject_label),
            machine_bound: bind_machine,
            nonce: random_nonce(),
            machine_id: bind_machine.then(|| self.machine_id()),
        };

        let payload = codec::encode(&claims)?;
        let signature = self.signer.sign(&payload);
        debug!(validity_days, bind_machine, "issued activation code");
        Ok(group(&format!("{payload}{PAYLOAD_SEPARATOR}{signature}")))
    }

    /// Verifies a code against the current time.
    ///
    /// # Errors
    ///
    /// Returns the first failing check; see [`LicenseService::verify_at`].
    pub fn verify(&self, code: &str, check_machine: bool) -> LicenseResult<VerifiedLicense> {
        self.verify_at(code, check_machine, Utc::now().timestamp())
    }

    /// Verifies a code as if the current time were `now`.
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// format, signature, payload decoding, version, expiry presence,
    /// expiry, and finally machine binding when `check_machine` is set.
    /// A code whose expiry equals `now` is still valid.
    ///
    /// # Errors
    ///
    /// Returns the [`LicenseError`] of the first failing check.
    pub fn verify_at(&self, code: &str, check_machine: bool, now: i64) -> LicenseResult<VerifiedLicense> {
        let result = self.check(code, check_machine, now);
        if let Err(e) = &result {
            debug!(kind = ?e.kind(), "rejected activation code");
        }
        result
    }

    fn check(&self, code: &str, check_machine: bool, now: i64) -> LicenseResult<VerifiedLicense> {
        let clean = strip_grouping(code);
        let (payload, signature) = split_code(&clean)?;

        if !self.signer.verify(payload, signature) {
            return Err(LicenseError::Signature);
        }

        let claims = codec::decode(payload)?;

        if claims.version != self.version {
            return Err(LicenseError::VersionMismatch {
                expected: self.version.clone(),
                found: claims.version,
            });
        }

        let expires_at = claims
            .expires_at
            .filter(|exp| *exp != 0)
            .ok_or(LicenseError::MissingExpiry)?;

        if now > expires_at {
            return Err(LicenseError::Expired { expires_at });
        }

        if check_machine && claims.machine_bound {
            let current = self.machine_id();
            if claims.machine_id.as_deref() != Some(current.as_str()) {
                return Err(LicenseError::MachineMismatch);
            }
        }

        let expires_at = DateTime::from_timestamp(expires_at, 0)
            .ok_or_else(|| LicenseError::Decode(format!("expiry out of range: {expires_at}")))?;

        Ok(VerifiedLicense {
            version: claims.version,
            expires_at,
            validity_days: claims.validity_days,
            subject_label: claims.subject_label,
            machine_bound: claims.machine_bound,
            nonce: claims.nonce,
            machine_id: claims.machine_id,
        })
    }

    /// Reads the claims of a code without verifying it.
    ///
    /// Same as [`UntrustedClaims::read`]; the service's secret is not used.
    #[must_use]
    pub fn inspect(&self, code: &str) -> Option<UntrustedClaims> {
        UntrustedClaims::read(code)
    }
}

/// Removes the cosmetic group separators from a code.
#[must_use]
pub fn strip_grouping(code: &str) -> String {
    code.trim().chars().filter(|c| *c != GROUP_SEPARATOR).collect()
}

fn split_code(clean: &str) -> LicenseResult<(&str, &str)> {
    let mut parts = clean.split(PAYLOAD_SEPARATOR);
    match (parts.next(), parts.next(), parts.next()) {
        (Some(payload), Some(signature), None) if !payload.is_empty() && !signature.is_empty() => {
            Ok((payload, signature))
        }
        (_, Some(_), Some(_)) => Err(LicenseError::Format(
            "code must contain exactly one '.' separator".into(),
        )),
        (_, Some(_), None) => Err(LicenseError::Format(
            "payload and signature must both be present".into(),
        )),
        _ => Err(LicenseError::Format("missing '.' separator".into())),
    }
}

fn group(code: &str) -> String {
    let separator = GROUP_SEPARATOR.to_string();
    let chars: Vec<char> = code.chars().collect();
    chars
        .chunks(GROUP_WIDTH)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(separator.as_str())
}

fn random_nonce() -> String {
    let mut bytes = [0u8; 4];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
