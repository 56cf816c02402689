//! In-memory credential store.

use super::{CredentialStore, NewAccount, UserAccount};
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    users: BTreeMap<i64, UserAccount>,
    role_permissions: HashMap<String, HashSet<String>>,
}

/// A credential store that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    state: RwLock<State>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn find_active_by_username_and_hash(
        &self,
        username: &str,
        password_hash: &str,
    ) -> StoreResult<Option<UserAccount>> {
        let state = self.state.read();
        Ok(state
            .users
            .values()
            .find(|u| u.active && u.username == username && u.password_hash == password_hash)
            .cloned())
    }

    fn find_by_id(&self, id: i64) -> StoreResult<Option<UserAccount>> {
        Ok(self.state.read().users.get(&id).cloned())
    }

    fn create(&self, account: NewAccount) -> StoreResult<UserAccount> {
        let mut state = self.state.write();
        if state.users.values().any(|u| u.username == account.username) {
            return Err(StoreError::DuplicateUsername(account.username));
        }
        if state.users.values().any(|u| u.email == account.email) {
            return Err(StoreError::DuplicateEmail(account.email));
        }

        state.next_id += 1;
        let user = UserAccount {
            id: state.next_id,
            username: account.username,
            password_hash: account.password_hash,
            email: account.email,
            role: account.role,
            created_at: account.created_at,
            last_login: None,
            active: true,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        let mut state = self.state.write();
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        user.last_login = Some(at);
        Ok(())
    }

    fn update_password(&self, id: i64, password_hash: &str) -> StoreResult<()> {
        let mut state = self.state.write();
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    fn set_active(&self, id: i64, active: bool) -> StoreResult<()> {
        let mut state = self.state.write();
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        user.active = active;
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<UserAccount>> {
        let state = self.state.read();
        let mut users: Vec<UserAccount> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }

    fn list_permissions(&self, role: &str) -> StoreResult<HashSet<String>> {
        Ok(self
            .state
            .read()
            .role_permissions
            .get(role)
            .cloned()
            .unwrap_or_default())
    }

    fn grant_permission(&self, role: &str, permission: &str) -> StoreResult<()> {
        self.state
            .write()
            .role_permissions
            .entry(role.to_string())
            .or_default()
            .insert(permission.to_string());
        Ok(())
    }
}
