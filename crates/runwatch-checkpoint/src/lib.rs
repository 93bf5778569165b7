//! Durable watermark storage for runwatch.
//!
//! A checkpoint store maps a monitored resource key (`owner/repo`) to the
//! instant below which every event for that resource has already been
//! delivered. The store is shared by resource key: saving one key preserves
//! every other key already persisted.
//!
//! # Backends
//!
//! | Backend | Medium | Write strategy |
//! |---------|--------|----------------|
//! | [`FileCheckpointStore`] | TOML text file | full rewrite into a temp file, then rename |
//! | [`SqliteCheckpointStore`] | SQLite table | UPSERT per key |
//! | [`MemoryCheckpointStore`] | process memory | shared map |
//!
//! None of the backends lock against other processes. One writer per store
//! is assumed.

use chrono::{DateTime, Utc};

mod error;
mod file;
mod memory;
mod schema;
mod sqlite;

pub use error::CheckpointError;
pub use file::FileCheckpointStore;
pub use memory::MemoryCheckpointStore;
pub use sqlite::SqliteCheckpointStore;

/// Contract implemented by every watermark backend.
pub trait CheckpointStore: Send {
    /// Returns the persisted watermark for `resource`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckpointError::NotFound`] if nothing was ever saved for
    /// `resource`, or another variant if the medium is unreadable.
    fn load(&self, resource: &str) -> Result<DateTime<Utc>, CheckpointError>;

    /// Persists `watermark` for `resource`. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns a [`CheckpointError`] if the medium cannot be written.
    fn save(&self, resource: &str, watermark: DateTime<Utc>) -> Result<(), CheckpointError>;
}

impl<T: CheckpointStore + ?Sized> CheckpointStore for Box<T> {
    fn load(&self, resource: &str) -> Result<DateTime<Utc>, CheckpointError> {
        (**self).load(resource)
    }

    fn save(&self, resource: &str, watermark: DateTime<Utc>) -> Result<(), CheckpointError> {
        (**self).save(resource, watermark)
    }
}

/// Formats a watermark the way every backend persists it.
pub(crate) fn encode_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true)
}

/// Parses a persisted watermark.
pub(crate) fn decode_instant(raw: &str) -> Result<DateTime<Utc>, CheckpointError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| CheckpointError::Parse(format!("invalid watermark '{raw}': {e}")))
}
