//! Error types for checkpoint persistence.

/// Errors that can occur while loading or saving a watermark.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// No watermark has been persisted for the resource.
    #[error("no checkpoint for resource '{0}'")]
    NotFound(String),

    /// The storage file could not be read or written.
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted content is not a valid checkpoint document or instant.
    #[error("checkpoint parse error: {0}")]
    Parse(String),

    /// The checkpoint document could not be serialized.
    #[error("checkpoint serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A database operation failed.
    #[error("checkpoint database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Upgrading the database to a schema version failed.
    #[error("checkpoint schema v{version} failed: {source}")]
    Schema {
        version: u32,
        source: rusqlite::Error,
    },

    /// The database was written by a newer schema than this build knows.
    #[error("checkpoint schema v{found} is newer than supported v{supported}")]
    UnsupportedSchema { found: u32, supported: u32 },

    /// The connection mutex was poisoned by a panicking writer.
    #[error("checkpoint store lock poisoned")]
    LockPoisoned,
}

impl CheckpointError {
    /// Returns `true` if the error only means "nothing saved yet".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
