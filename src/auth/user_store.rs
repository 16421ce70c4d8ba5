//! User Storage
//! Mission: Persist user accounts behind an injectable store interface

use crate::auth::models::{username_key, User};
use crate::db::Database;
use chrono::Utc;
use parking_lot::RwLock;
use rusqlite::{params, OptionalExtension, Row};
use std::fmt;
use tracing::info;

/// Errors from a user store.
#[derive(Debug)]
pub enum StoreError {
    /// Username already taken (case-insensitive)
    Duplicate(String),
    /// Record would violate a store invariant
    Invalid(&'static str),
    Backend(anyhow::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate(name) => write!(f, "Username already exists: {}", name),
            Self::Invalid(reason) => write!(f, "Invalid user record: {}", reason),
            Self::Backend(e) => write!(f, "Store backend error: {:#}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.into())
    }
}

/// Storage contract used by the auth orchestrator and the users endpoints.
///
/// Lookups by username are case-insensitive; `create` assigns the id and
/// refuses duplicates and empty hashes.
pub trait UserStore: Send + Sync {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;
    fn list(&self) -> Result<Vec<User>, StoreError>;
    fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;
}

fn check_new_user(username: &str, password_hash: &str) -> Result<(), StoreError> {
    if username.trim().is_empty() {
        return Err(StoreError::Invalid("empty username"));
    }
    if password_hash.is_empty() {
        return Err(StoreError::Invalid("empty password hash"));
    }
    Ok(())
}

/// User storage with SQLite backend
pub struct SqliteUserStore {
    db: Database,
}

impl SqliteUserStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

impl UserStore for SqliteUserStore {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let conn = self.db.conn();
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, created_at
                 FROM users WHERE username_key = ?1",
                params![username_key(username)],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let conn = self.db.conn();
        let user = conn
            .query_row(
                "SELECT id, username, password_hash, created_at FROM users WHERE id = ?1",
                params![id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn list(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.db.conn();
        let mut stmt =
            conn.prepare("SELECT id, username, password_hash, created_at FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], Self::row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        check_new_user(username, password_hash)?;

        let created_at = Utc::now().to_rfc3339();
        let conn = self.db.conn();
        let inserted = conn.execute(
            "INSERT INTO users (username, username_key, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![username, username_key(username), password_hash, created_at],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                return Err(StoreError::Duplicate(username.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let user = User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at,
        };

        info!("✅ Created user: {} ({})", user.username, user.id);
        Ok(user)
    }
}

/// Process-local user list (tests and throwaway runs)
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserStore for InMemoryUserStore {
    fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let key = username_key(username);
        let users = self.users.read();
        Ok(users
            .iter()
            .find(|u| username_key(&u.username) == key)
            .cloned())
    }

    fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().iter().find(|u| u.id == id).cloned())
    }

    fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.read().clone())
    }

    fn create(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        check_new_user(username, password_hash)?;

        let key = username_key(username);
        let mut users = self.users.write();
        if users.iter().any(|u| username_key(&u.username) == key) {
            return Err(StoreError::Duplicate(username.to_string()));
        }

        let user = User {
            id: users.len() as i64 + 1,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };
        users.push(user.clone());
        Ok(user)
    }
}
