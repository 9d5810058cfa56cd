//! SQLite-backed registry of persisted tree grants.
//!
//! This is what makes a grant survive a process restart for
//! [`LocalProvider`](crate::LocalProvider).

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use doctree_core::{AccessMode, TreeUri};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::PersistedPermission;

/// Durable grant registry.
///
/// Thread-safe via internal Mutex. Calls block; run them off the async
/// runtime.
#[derive(Clone)]
pub struct SqliteGrantRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGrantRegistry {
    /// Open a registry database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory registry. Grants die with it.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(format!("grant registry: {}", e)))?;
        f(&conn)
    }

    /// Record a grant. Re-granting widens, never narrows, the stored mode.
    pub fn persist(&self, tree: &TreeUri, mode: AccessMode) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO persisted_grants (tree_uri, can_read, can_write, persisted_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(tree_uri) DO UPDATE SET
                    can_read = MAX(can_read, excluded.can_read),
                    can_write = MAX(can_write, excluded.can_write)",
                params![tree.as_str(), mode.read, mode.write, crate::now_millis()],
            )?;
            Ok(())
        })
    }

    /// Remove a grant. Returns whether it existed.
    pub fn release(&self, tree: &TreeUri) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM persisted_grants WHERE tree_uri = ?1",
                params![tree.as_str()],
            )?;
            Ok(removed > 0)
        })
    }

    /// Look up the grant on one tree.
    pub fn get(&self, tree: &TreeUri) -> Result<Option<PersistedPermission>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT tree_uri, can_read, can_write, persisted_at
                     FROM persisted_grants WHERE tree_uri = ?1",
                    params![tree.as_str()],
                    row_to_permission,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// All grants, oldest first.
    pub fn list(&self) -> Result<Vec<PersistedPermission>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT tree_uri, can_read, can_write, persisted_at
                 FROM persisted_grants ORDER BY persisted_at, tree_uri",
            )?;
            let rows = stmt
                .query_map([], row_to_permission)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

fn row_to_permission(row: &rusqlite::Row<'_>) -> rusqlite::Result<PersistedPermission> {
    Ok(PersistedPermission {
        tree: TreeUri::new(row.get::<_, String>("tree_uri")?),
        mode: AccessMode {
            read: row.get("can_read")?,
            write: row.get("can_write")?,
        },
        persisted_at: row.get("persisted_at")?,
    })
}
