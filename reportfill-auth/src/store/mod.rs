//! Account persistence.
//!
//! The authentication service only talks to accounts through the
//! [`CredentialStore`] trait. Two implementations ship with the crate: an
//! in-memory store and a SQLite store.

mod memory;
mod sqlite;

pub use memory::MemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;

use crate::error::StoreResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// Role name with full privileges.
pub const ADMIN_ROLE: &str = "admin";

/// Role given to accounts created without an explicit one.
pub const DEFAULT_ROLE: &str = "user";

/// A stored user account.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub active: bool,
}

impl UserAccount {
    /// Returns true if the account has the privileged admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

impl std::fmt::Debug for UserAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserAccount")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("email", &self.email)
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .field("last_login", &self.last_login)
            .field("active", &self.active)
            .finish()
    }
}

/// Fields needed to create an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub username: String,
    pub password_hash: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Persistence for user accounts and role permissions.
///
/// Implementations must be safe to call from many threads at once.
pub trait CredentialStore: Send + Sync {
    /// Finds an active account whose username and password hash both match.
    fn find_active_by_username_and_hash(
        &self,
        username: &str,
        password_hash: &str,
    ) -> StoreResult<Option<UserAccount>>;

    /// Finds an account by id, active or not.
    fn find_by_id(&self, id: i64) -> StoreResult<Option<UserAccount>>;

    /// Creates an active account.
    ///
    /// Fails with `DuplicateUsername` before `DuplicateEmail` when both clash.
    fn create(&self, account: NewAccount) -> StoreResult<UserAccount>;

    fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()>;

    fn update_password(&self, id: i64, password_hash: &str) -> StoreResult<()>;

    fn set_active(&self, id: i64, active: bool) -> StoreResult<()>;

    /// Lists all accounts, newest first.
    fn list(&self) -> StoreResult<Vec<UserAccount>>;

    /// Returns the permission names granted to `role`.
    fn list_permissions(&self, role: &str) -> StoreResult<HashSet<String>>;

    /// Grants `permission` to `role`. Granting twice is a no-op.
    fn grant_permission(&self, role: &str, permission: &str) -> StoreResult<()>;
}
