//! Shared test helpers for authentication tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use reportfill_auth::{
    AuthConfig, AuthenticationService, CredentialStore, ManualClock, MemoryCredentialStore,
    NewAccount, StoreError, StoreResult, UserAccount, DEFAULT_ROLE,
};
use std::collections::HashSet;
use std::sync::Arc;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "Valid1Pass!";
pub const EMAIL: &str = "alice@example.com";

/// Fixed start time for the manual clock (2026-01-01T00:00:00Z).
pub fn start() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600, 0).unwrap()
}

/// A service backed by an in-memory store with one registered user.
pub struct Harness {
    pub service: AuthenticationService,
    pub store: Arc<MemoryCredentialStore>,
    pub clock: Arc<ManualClock>,
    pub user: UserAccount,
}

pub fn harness() -> Harness {
    harness_with(AuthConfig::default())
}

pub fn harness_with(config: AuthConfig) -> Harness {
    let store = Arc::new(MemoryCredentialStore::new());
    let clock = Arc::new(ManualClock::new(start()));
    let service = AuthenticationService::with_clock(store.clone(), config, clock.clone());
    let user = service.register(USERNAME, PASSWORD, EMAIL, DEFAULT_ROLE).unwrap();
    Harness {
        service,
        store,
        clock,
        user,
    }
}

/// A store whose every operation fails.
pub struct FailingStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("database is locked".into()))
}

impl CredentialStore for FailingStore {
    fn find_active_by_username_and_hash(&self, _: &str, _: &str) -> StoreResult<Option<UserAccount>> {
        down()
    }

    fn find_by_id(&self, _: i64) -> StoreResult<Option<UserAccount>> {
        down()
    }

    fn create(&self, _: NewAccount) -> StoreResult<UserAccount> {
        down()
    }

    fn update_last_login(&self, _: i64, _: DateTime<Utc>) -> StoreResult<()> {
        down()
    }

    fn update_password(&self, _: i64, _: &str) -> StoreResult<()> {
        down()
    }

    fn set_active(&self, _: i64, _: bool) -> StoreResult<()> {
        down()
    }

    fn list(&self) -> StoreResult<Vec<UserAccount>> {
        down()
    }

    fn list_permissions(&self, _: &str) -> StoreResult<HashSet<String>> {
        down()
    }

    fn grant_permission(&self, _: &str, _: &str) -> StoreResult<()> {
        down()
    }
}

/// A store that authenticates normally but cannot record logins.
pub struct NoLastLoginStore(pub MemoryCredentialStore);

impl CredentialStore for NoLastLoginStore {
    fn find_active_by_username_and_hash(&self, u: &str, h: &str) -> StoreResult<Option<UserAccount>> {
        self.0.find_active_by_username_and_hash(u, h)
    }

    fn find_by_id(&self, id: i64) -> StoreResult<Option<UserAccount>> {
        self.0.find_by_id(id)
    }

    fn create(&self, account: NewAccount) -> StoreResult<UserAccount> {
        self.0.create(account)
    }

    fn update_last_login(&self, _: i64, _: DateTime<Utc>) -> StoreResult<()> {
        down()
    }

    fn update_password(&self, id: i64, hash: &str) -> StoreResult<()> {
        self.0.update_password(id, hash)
    }

    fn set_active(&self, id: i64, active: bool) -> StoreResult<()> {
        self.0.set_active(id, active)
    }

    fn list(&self) -> StoreResult<Vec<UserAccount>> {
        self.0.list()
    }

    fn list_permissions(&self, role: &str) -> StoreResult<HashSet<String>> {
        self.0.list_permissions(role)
    }

    fn grant_permission(&self, role: &str, permission: &str) -> StoreResult<()> {
        self.0.grant_permission(role, permission)
    }
}
