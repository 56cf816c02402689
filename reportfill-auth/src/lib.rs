//! User authentication for ReportFill.
//!
//! This crate handles:
//! - Password complexity rules and password hashing
//! - Per-username brute-force lockout held in process memory
//! - Account storage behind the [`CredentialStore`] trait, with SQLite and
//!   in-memory implementations
//! - Role-based permission lookups
//!
//! # Lockout
//!
//! After [`DEFAULT_MAX_ATTEMPTS`] failed logins a username is locked for
//! [`DEFAULT_LOCKOUT_DURATION`], measured from its most recent failure.
//! While locked, attempts are refused without consulting the store.
//! Lockout state is not persisted and resets when the process restarts.

mod clock;
mod config;
mod error;
mod lockout;
mod password;
mod service;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AuthConfig, DEFAULT_LOCKOUT_DURATION, DEFAULT_MAX_ATTEMPTS};
pub use error::{format_remaining, AuthError, AuthErrorKind, AuthResult, StoreError, StoreResult};
pub use lockout::{LockStatus, LockoutGuard, LockoutRecord, SWEEP_THRESHOLD};
pub use password::{
    hash_password, validate_password_complexity, PasswordRule, MIN_PASSWORD_CHARS, SPECIAL_CHARS,
};
pub use service::AuthenticationService;
pub use store::{
    CredentialStore, MemoryCredentialStore, NewAccount, SqliteCredentialStore, UserAccount,
    ADMIN_ROLE, DEFAULT_ROLE,
};
