//! Authentication settings.

use std::time::Duration;

/// Failed attempts allowed before an account locks.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// How long a locked account stays locked after its last failure.
pub const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(600);

/// Lockout and authentication settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Failures that engage the lockout.
    pub max_attempts: u32,
    /// Lockout window, measured from the most recent failure.
    pub lockout_duration: Duration,
    /// Whether an attempt against a locked account counts as another
    /// failure, which refreshes the last failure time and so extends the
    /// lockout for as long as attempts keep arriving.
    pub extend_lockout_while_locked: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lockout_duration: DEFAULT_LOCKOUT_DURATION,
            extend_lockout_while_locked: true,
        }
    }
}
