//! SQLite-backed credential store.
//!
//! Uses the `users`, `permissions` and `role_permissions` tables of the
//! application database. Passwords are stored as hex digests in the
//! `password` column.

use super::{CredentialStore, NewAccount, UserAccount};
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashSet;
use std::path::Path;

const USER_COLUMNS: &str = "id, username, password, email, role, created_at, last_login, is_active";

/// Persistent credential store backed by SQLite.
pub struct SqliteCredentialStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCredentialStore").finish_non_exhaustive()
    }
}

impl SqliteCredentialStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path).map_err(unavailable("failed to open credential store"))?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(unavailable("failed to open in-memory credential store"))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                password TEXT NOT NULL,
                email TEXT UNIQUE NOT NULL,
                role TEXT NOT NULL DEFAULT 'user',
                created_at TEXT NOT NULL,
                last_login TEXT,
                is_active INTEGER NOT NULL DEFAULT 1
            );

            CREATE TABLE IF NOT EXISTS permissions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                permission_name TEXT UNIQUE NOT NULL
            );

            CREATE TABLE IF NOT EXISTS role_permissions (
                role TEXT NOT NULL,
                permission_id INTEGER NOT NULL REFERENCES permissions(id),
                UNIQUE(role, permission_id)
            );
            ",
        )
        .map_err(unavailable("failed to init credential schema"))?;
        Ok(())
    }

    fn find_one(&self, sql: &str, params: impl rusqlite::Params) -> StoreResult<Option<UserAccount>> {
        let conn = self.conn.lock();
        conn.query_row(sql, params, row_to_account)
            .optional()
            .map_err(unavailable("failed to query users"))
    }

    fn update_one(&self, id: i64, sql: &str, params: impl rusqlite::Params) -> StoreResult<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(sql, params)
            .map_err(unavailable("failed to update user"))?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

impl CredentialStore for SqliteCredentialStore {
    fn find_active_by_username_and_hash(
        &self,
        username: &str,
        password_hash: &str,
    ) -> StoreResult<Option<UserAccount>> {
        self.find_one(
            &format!(
                "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 AND password = ?2 AND is_active = 1"
            ),
            params![username, password_hash],
        )
    }

    fn find_by_id(&self, id: i64) -> StoreResult<Option<UserAccount>> {
        self.find_one(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"), params![id])
    }

    fn create(&self, account: NewAccount) -> StoreResult<UserAccount> {
        let conn = self.conn.lock();

        let exists = |sql: &str, value: &str| -> StoreResult<bool> {
            conn.query_row(sql, params![value], |_| Ok(()))
                .optional()
                .map(|row| row.is_some())
                .map_err(unavailable("failed to check existing users"))
        };
        if exists("SELECT id FROM users WHERE username = ?1", &account.username)? {
            return Err(StoreError::DuplicateUsername(account.username));
        }
        if exists("SELECT id FROM users WHERE email = ?1", &account.email)? {
            return Err(StoreError::DuplicateEmail(account.email));
        }

        conn.execute(
            "INSERT INTO users (username, password, email, role, created_at, is_active) VALUES (?1, ?2, ?3, ?4, ?5, 1)",
            params![
                account.username,
                account.password_hash,
                account.email,
                account.role,
                account.created_at,
            ],
        )
        .map_err(unavailable("failed to insert user"))?;

        Ok(UserAccount {
            id: conn.last_insert_rowid(),
            username: account.username,
            password_hash: account.password_hash,
            email: account.email,
            role: account.role,
            created_at: account.created_at,
            last_login: None,
            active: true,
        })
    }

    fn update_last_login(&self, id: i64, at: DateTime<Utc>) -> StoreResult<()> {
        self.update_one(id, "UPDATE users SET last_login = ?1 WHERE id = ?2", params![at, id])
    }

    fn update_password(&self, id: i64, password_hash: &str) -> StoreResult<()> {
        self.update_one(id, "UPDATE users SET password = ?1 WHERE id = ?2", params![password_hash, id])
    }

    fn set_active(&self, id: i64, active: bool) -> StoreResult<()> {
        self.update_one(id, "UPDATE users SET is_active = ?1 WHERE id = ?2", params![active, id])
    }

    fn list(&self) -> StoreResult<Vec<UserAccount>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"))
            .map_err(unavailable("failed to prepare user listing"))?;
        let rows = stmt
            .query_map([], row_to_account)
            .map_err(unavailable("failed to list users"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(unavailable("failed to read user row"))
    }

    fn list_permissions(&self, role: &str) -> StoreResult<HashSet<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT p.permission_name FROM permissions p
                 JOIN role_permissions rp ON p.id = rp.permission_id
                 WHERE rp.role = ?1",
            )
            .map_err(unavailable("failed to prepare permission query"))?;
        let rows = stmt
            .query_map(params![role], |row| row.get::<_, String>(0))
            .map_err(unavailable("failed to list permissions"))?;
        rows.collect::<Result<HashSet<_>, _>>()
            .map_err(unavailable("failed to read permission row"))
    }

    fn grant_permission(&self, role: &str, permission: &str) -> StoreResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(unavailable("failed to begin transaction"))?;
        tx.execute(
            "INSERT OR IGNORE INTO permissions (permission_name) VALUES (?1)",
            params![permission],
        )
        .map_err(unavailable("failed to insert permission"))?;
        tx.execute(
            "INSERT OR IGNORE INTO role_permissions (role, permission_id)
             SELECT ?1, id FROM permissions WHERE permission_name = ?2",
            params![role, permission],
        )
        .map_err(unavailable("failed to grant permission"))?;
        tx.commit().map_err(unavailable("failed to commit permission grant"))?;
        Ok(())
    }
}

fn row_to_account(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        email: row.get(3)?,
        role: row.get(4)?,
        created_at: row.get(5)?,
        last_login: row.get(6)?,
        active: row.get(7)?,
    })
}

fn unavailable(context: &'static str) -> impl Fn(rusqlite::Error) -> StoreError {
    move |e| StoreError::Unavailable(format!("{context}: {e}"))
}
