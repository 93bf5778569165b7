//! SQLite backend.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::CheckpointError;
use crate::schema::ensure_schema;
use crate::{decode_instant, encode_instant, CheckpointStore};

/// Watermarks stored in the `checkpoints` table of a SQLite database.
#[derive(Debug)]
pub struct SqliteCheckpointStore {
    conn: Mutex<Connection>,
}

impl SqliteCheckpointStore {
    /// Opens (creating if needed) the database at `path` and upgrades its
    /// schema.
    ///
    /// # Errors
    ///
    /// Returns `CheckpointError::Database` if the file cannot be opened or
    /// `CheckpointError::Schema` / `CheckpointError::UnsupportedSchema` if the
    /// schema cannot be brought up to date.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens a private in-memory database.
    ///
    /// # Errors
    ///
    /// See [`SqliteCheckpointStore::open`].
    pub fn open_in_memory() -> Result<Self, CheckpointError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, CheckpointError> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        ensure_schema(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn load(&self, resource: &str) -> Result<DateTime<Utc>, CheckpointError> {
        let conn = self.conn.lock().map_err(|_| CheckpointError::LockPoisoned)?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT watermark FROM checkpoints WHERE resource_key = ?1",
                params![resource],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => decode_instant(&raw),
            None => Err(CheckpointError::NotFound(resource.to_string())),
        }
    }

    fn save(&self, resource: &str, watermark: DateTime<Utc>) -> Result<(), CheckpointError> {
        let conn = self.conn.lock().map_err(|_| CheckpointError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO checkpoints (resource_key, watermark, updated_at)
             VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(resource_key) DO UPDATE SET
                watermark = excluded.watermark,
                updated_at = excluded.updated_at",
            params![resource, encode_instant(watermark)],
        )?;
        Ok(())
    }
}
