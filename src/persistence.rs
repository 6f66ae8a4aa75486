//! SQLite persistence for saved routes.
//!
//! Implements the persistence collaborator: a [`RouteSnapshot`] is stored
//! as a MessagePack blob keyed by route name. Storage-format versioning is
//! out of scope.

use std::fmt;
use std::path::Path;

use log::info;
use rusqlite::{params, Connection, OptionalExtension};

use crate::engine::RouteSnapshot;
use crate::error::{Result, RoutePlanError};

fn storage_error<E: fmt::Display>(err: E) -> RoutePlanError {
    RoutePlanError::PersistenceError {
        message: err.to_string(),
    }
}

/// SQLite-backed store of named route snapshots.
pub struct RouteStore {
    conn: Connection,
}

impl RouteStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path).map_err(storage_error)?;
        Self::init(conn)
    }

    /// Open an in-memory store, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_error)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS routes (
                name     TEXT PRIMARY KEY,
                comments TEXT,
                snapshot BLOB NOT NULL
            );",
        )
        .map_err(storage_error)?;
        Ok(Self { conn })
    }

    /// Save a snapshot under its name, replacing any previous version.
    /// A snapshot without a name cannot be saved.
    pub fn save(&self, snapshot: &RouteSnapshot) -> Result<()> {
        let name = snapshot
            .name
            .as_deref()
            .ok_or_else(|| RoutePlanError::PersistenceError {
                message: "route has no name".to_string(),
            })?;

        let blob = rmp_serde::to_vec(snapshot).map_err(storage_error)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO routes (name, comments, snapshot) VALUES (?1, ?2, ?3)",
                params![name, snapshot.comments, blob],
            )
            .map_err(storage_error)?;

        info!("[RouteStore] saved '{}'", name);
        Ok(())
    }

    /// Load a snapshot by name. Returns `None` when no route has that name.
    pub fn load(&self, name: &str) -> Result<Option<RouteSnapshot>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT snapshot FROM routes WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()
            .map_err(storage_error)?;

        match blob {
            Some(bytes) => Ok(Some(rmp_serde::from_slice(&bytes).map_err(storage_error)?)),
            None => Ok(None),
        }
    }

    /// Names of all saved routes, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM routes ORDER BY name")
            .map_err(storage_error)?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .map_err(storage_error)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(storage_error)?;
        Ok(names)
    }

    /// Delete a saved route. Returns `false` when no route had that name.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM routes WHERE name = ?1", params![name])
            .map_err(storage_error)?;
        Ok(rows > 0)
    }
}
