//! Schema of the SQLite backend, versioned with `PRAGMA user_version`.
//!
//! `SCHEMA[n]` upgrades a database from version `n` to `n + 1`. A database
//! written by a newer runwatch is refused rather than modified.

use rusqlite::{Connection, TransactionBehavior};

use crate::error::CheckpointError;

const SCHEMA: &[&str] = &[include_str!("schema/v1_checkpoints.sql")];

/// Highest schema version this build understands.
pub(crate) fn supported_version() -> u32 {
    SCHEMA.len() as u32
}

/// Brings `conn` up to the supported version and returns the version it was
/// found at.
pub(crate) fn ensure_schema(conn: &mut Connection) -> Result<u32, CheckpointError> {
    let found: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    let supported = supported_version();

    if found > supported {
        return Err(CheckpointError::UnsupportedSchema { found, supported });
    }
    if found == supported {
        return Ok(found);
    }

    // Immediate, so two processes opening a fresh file do not both upgrade it.
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    for (version, sql) in (found + 1..).zip(&SCHEMA[found as usize..]) {
        tx.execute_batch(sql)
            .map_err(|source| CheckpointError::Schema { version, source })?;
    }
    tx.pragma_update(None, "user_version", supported)?;
    tx.commit()?;

    tracing::info!(from = found, to = supported, "upgraded checkpoint schema");
    Ok(found)
}
