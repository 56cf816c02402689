//! License configuration.
//!
//! The signing secret is provisioned from the environment (or by the
//! embedding application) rather than compiled into the binary.

use crate::error::{LicenseError, LicenseResult};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Environment variable holding the shared signing secret.
pub const SECRET_ENV: &str = "REPORTFILL_LICENSE_SECRET";

/// Environment variable overriding the license version literal.
pub const VERSION_ENV: &str = "REPORTFILL_LICENSE_VERSION";

/// Version literal written into and required from every code.
pub const DEFAULT_LICENSE_VERSION: &str = "1.0";

/// Shared secret for activation code signatures, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret {
    bytes: Vec<u8>,
}

impl SigningSecret {
    /// Wraps raw secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if the secret is empty.
    pub fn new(bytes: impl Into<Vec<u8>>) -> LicenseResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(LicenseError::Config("signing secret must not be empty".into()));
        }
        Ok(Self { bytes })
    }

    /// Returns the secret bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningSecret")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Settings shared by issuance and verification.
#[derive(Debug, Clone)]
pub struct LicenseConfig {
    /// Shared signing secret.
    pub secret: SigningSecret,
    /// Version literal embedded in issued codes and required on verify.
    pub version: String,
}

impl LicenseConfig {
    /// Creates a config with the default version.
    #[must_use]
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            version: DEFAULT_LICENSE_VERSION.to_string(),
        }
    }

    /// Loads the config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if [`SECRET_ENV`] is unset or empty.
    pub fn from_env() -> LicenseResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads the config through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if the secret is missing or empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> LicenseResult<Self> {
        let secret = lookup(SECRET_ENV)
            .ok_or_else(|| LicenseError::Config(format!("{SECRET_ENV} is not set")))?;
        let version = lookup(VERSION_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LICENSE_VERSION.to_string());
        Ok(Self {
            secret: SigningSecret::new(secret.into_bytes())?,
            version,
        })
    }
}
