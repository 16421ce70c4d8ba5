//! SQLite Handle
//!
//! One connection guarded by a mutex, shared by the user store, the
//! destinations catalogue and the timewarp records.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE users (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT,
//!     username TEXT NOT NULL,
//!     username_key TEXT NOT NULL UNIQUE,   -- lower-cased username
//!     password_hash TEXT NOT NULL,
//!     created_at TEXT NOT NULL
//! );
//! CREATE TABLE destinations (id INTEGER PRIMARY KEY, name, year, description);
//! CREATE TABLE timewarp (id INTEGER PRIMARY KEY, title, era, year, description, created_at);
//! ```

use anyhow::{Context, Result};
use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Version history:
/// - v1: users, destinations, timewarp
const SCHEMA_VERSION: u32 = 1;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL,
        username_key TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL CHECK (length(password_hash) > 0),
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS destinations (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        year INTEGER NOT NULL,
        description TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS timewarp (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        era TEXT,
        year INTEGER,
        description TEXT,
        created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database file and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("open database at {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();

        let db = Self::from_connection(conn);
        db.migrate()?;
        info!("🗄️  Database ready at {}", path.display());
        Ok(db)
    }

    /// In-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory database")?;
        let db = Self::from_connection(conn);
        db.migrate()?;
        Ok(db)
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(SCHEMA).context("apply schema")?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .context("record schema version")?;
        Ok(())
    }

    /// Exclusive access to the underlying connection.
    pub fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    pub fn schema_version(&self) -> Result<u32> {
        let conn = self.conn.lock();
        conn.query_row("PRAGMA user_version", [], |row| row.get(0))
            .context("read schema version")
    }
}
