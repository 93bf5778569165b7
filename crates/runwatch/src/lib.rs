//! Library side of the `runwatch` binary: configuration loading, backend
//! selection, and the terminal presenter.

pub mod config;
pub mod terminal;

use runwatch_checkpoint::{
    CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, SqliteCheckpointStore,
};

use config::{CheckpointBackend, CheckpointConfig};

/// Opens the checkpoint backend selected in configuration.
///
/// A SQLite database that cannot be opened, is not a database, or carries a
/// newer schema is left untouched. The watermark is then kept in memory for
/// this process only, so monitoring starts live and nothing is persisted.
/// The file backend cannot fail here; its errors surface on load and save.
pub fn open_checkpoint_store(config: &CheckpointConfig) -> Box<dyn CheckpointStore> {
    match config.backend {
        CheckpointBackend::File => Box::new(FileCheckpointStore::new(&config.path)),
        CheckpointBackend::Sqlite => match SqliteCheckpointStore::open(&config.path) {
            Ok(store) => Box::new(store),
            Err(e) => {
                tracing::warn!(
                    path = %config.path,
                    error = %e,
                    "cannot open checkpoint database, watermark will not be persisted"
                );
                Box::new(MemoryCheckpointStore::new())
            }
        },
    }
}
