//! Password authentication gated by the lockout guard.

use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::lockout::{LockStatus, LockoutGuard};
use crate::password::{PasswordRule, hash_password, validate_password_complexity};
use crate::store::{CredentialStore, NewAccount, UserAccount};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Authenticates users and manages their accounts.
///
/// Lockout state is held in memory by the service. Share one instance
/// (for example behind an `Arc`) across every request handler so that all
/// attempts against a username are counted together.
pub struct AuthenticationService {
    store: Arc<dyn CredentialStore>,
    lockout: LockoutGuard,
    clock: Arc<dyn Clock>,
    extend_lockout_while_locked: bool,
}

impl std::fmt::Debug for AuthenticationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationService")
            .field("lockout", &self.lockout)
            .field("extend_lockout_while_locked", &self.extend_lockout_while_locked)
            .finish_non_exhaustive()
    }
}

impl AuthenticationService {
    /// Creates a service over `store` using the system clock.
    #[must_use]
    pub fn new(store: Arc<dyn CredentialStore>, config: AuthConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    /// Creates a service with a custom clock.
    #[must_use]
    pub fn with_clock(store: Arc<dyn CredentialStore>, config: AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            lockout: LockoutGuard::new(&config, clock.clone()),
            clock,
            extend_lockout_while_locked: config.extend_lockout_while_locked,
        }
    }

    /// Returns the lockout guard.
    #[must_use]
    pub fn lockout(&self) -> &LockoutGuard {
        &self.lockout
    }

    /// Checks a username and password.
    ///
    /// A locked account is refused before the store is consulted, even if
    /// the password is right; by default the refused attempt itself counts
    /// as another failure. Store failures are reported as
    /// [`AuthError::StoreUnavailable`] and do not count against the user.
    ///
    /// # Errors
    ///
    /// - [`AuthError::LockedOut`] if the account is locked
    /// - [`AuthError::InvalidCredentials`] on a wrong username or password
    /// - [`AuthError::LockoutEngaged`] if this failure locked the account
    /// - [`AuthError::StoreUnavailable`] if the store failed
    pub fn authenticate(&self, username: &str, password: &str) -> AuthResult<UserAccount> {
        if let LockStatus::Locked { remaining_secs } =
            self.lockout.check_attempt(username, self.extend_lockout_while_locked)
        {
            warn!(username, remaining_secs, "login refused, account locked");
            return Err(AuthError::LockedOut { remaining_secs });
        }

        let hash = hash_password(password);
        let found = self.store.find_active_by_username_and_hash(username, &hash)?;

        match found {
            Some(mut account) if account.active => {
                self.lockout.record_attempt(username, true);
                let now = self.clock.now();
                match self.store.update_last_login(account.id, now) {
                    Ok(()) => account.last_login = Some(now),
                    Err(e) => warn!(user_id = account.id, error = %e, "failed to update last login"),
                }
                info!(username, user_id = account.id, "login succeeded");
                Ok(account)
            }
            _ => {
                let remaining_attempts = self.lockout.record_failure(username);
                if remaining_attempts > 0 {
                    info!(username, remaining_attempts, "login failed");
                    Err(AuthError::InvalidCredentials { remaining_attempts })
                } else {
                    warn!(username, "login failed, account locked");
                    Err(AuthError::LockoutEngaged {
                        lockout_secs: self.lockout.lockout_duration().as_secs(),
                    })
                }
            }
        }
    }

    /// Checks a password against the complexity rules.
    ///
    /// # Errors
    ///
    /// Returns the first [`PasswordRule`] the password breaks.
    pub fn validate_password_complexity(password: &str) -> Result<(), PasswordRule> {
        validate_password_complexity(password)
    }

    /// Creates an active account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ComplexityViolation`], then
    /// [`AuthError::DuplicateUsername`], then [`AuthError::DuplicateEmail`],
    /// whichever applies first.
    pub fn register(&self, username: &str, password: &str, email: &str, role: &str) -> AuthResult<UserAccount> {
        validate_password_complexity(password)?;
        let account = self.store.create(NewAccount {
            username: username.to_string(),
            password_hash: hash_password(password),
            email: email.to_string(),
            role: role.to_string(),
            created_at: self.clock.now(),
        })?;
        info!(username, user_id = account.id, role, "account created");
        Ok(account)
    }

    /// Replaces a user's password after checking the old one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ComplexityViolation`] if the new password is too
    /// weak, or [`AuthError::WrongPassword`] if the user is unknown or the
    /// old password is wrong. Password changes do not count toward lockout.
    pub fn change_password(&self, user_id: i64, old_password: &str, new_password: &str) -> AuthResult<()> {
        validate_password_complexity(new_password)?;

        let account = self.store.find_by_id(user_id)?;
        let old_hash = hash_password(old_password);
        match account {
            Some(account) if account.password_hash == old_hash => {
                self.store.update_password(user_id, &hash_password(new_password))?;
                info!(user_id, "password changed");
                Ok(())
            }
            _ => Err(AuthError::WrongPassword),
        }
    }

    /// Enables or disables an account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotFound`] for an unknown user.
    pub fn set_active(&self, user_id: i64, active: bool) -> AuthResult<()> {
        self.store.set_active(user_id, active)?;
        info!(user_id, active, "account status changed");
        Ok(())
    }

    /// Flips an account between active and inactive, returning the new state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotFound`] for an unknown user.
    pub fn toggle_active(&self, user_id: i64) -> AuthResult<bool> {
        let account = self.store.find_by_id(user_id)?.ok_or(AuthError::NotFound(user_id))?;
        let active = !account.active;
        self.set_active(user_id, active)?;
        Ok(active)
    }

    /// Lists all accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreUnavailable`] if the store failed.
    pub fn list_users(&self) -> AuthResult<Vec<UserAccount>> {
        Ok(self.store.list()?)
    }

    /// Returns the permissions of a user's role; empty for unknown users.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreUnavailable`] if the store failed.
    pub fn permissions(&self, user_id: i64) -> AuthResult<HashSet<String>> {
        match self.store.find_by_id(user_id)? {
            Some(account) => Ok(self.store.list_permissions(&account.role)?),
            None => Ok(HashSet::new()),
        }
    }

    /// Returns true if the user's role grants `permission`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::StoreUnavailable`] if the store failed.
    pub fn has_permission(&self, user_id: i64, permission: &str) -> AuthResult<bool> {
        Ok(self.permissions(user_id)?.contains(permission))
    }

    /// Fails unless the user's role grants `permission`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::PermissionDenied`] if it does not.
    pub fn require_permission(&self, user_id: i64, permission: &str) -> AuthResult<()> {
        if self.has_permission(user_id, permission)? {
            Ok(())
        } else {
            Err(AuthError::PermissionDenied(permission.to_string()))
        }
    }
}
