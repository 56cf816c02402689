//! Shared test helpers for license tests.

#![allow(dead_code)]

use reportfill_license::{FingerprintSource, LicenseConfig, LicenseService, SigningSecret};
use std::sync::Arc;

/// Fixed "current time" used by deterministic tests (2026-01-01T00:00:00Z).
pub const NOW: i64 = 1_767_225_600;

pub const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// A fingerprint source that always reports the same id.
pub struct FixedFingerprint(pub &'static str);

impl FingerprintSource for FixedFingerprint {
    fn current_id(&self) -> String {
        self.0.to_string()
    }
}

pub fn test_config() -> LicenseConfig {
    LicenseConfig::new(SigningSecret::new("test-secret-key").unwrap())
}

/// Returns a service whose host fingerprint is `machine`.
pub fn service_on(machine: &'static str) -> LicenseService {
    LicenseService::with_fingerprint(test_config(), Arc::new(FixedFingerprint(machine)))
}

pub fn test_service() -> LicenseService {
    service_on("a1b2c3d4")
}

/// Splits a formatted code into its cleaned payload and signature.
pub fn parts(code: &str) -> (String, String) {
    let clean = code.replace('-', "");
    let (payload, signature) = clean.split_once('.').unwrap();
    (payload.to_string(), signature.to_string())
}

/// Reassembles a payload and signature without grouping.
pub fn join(payload: &str, signature: &str) -> String {
    format!("{payload}.{signature}")
}
