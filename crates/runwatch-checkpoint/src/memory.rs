//! In-process backend.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::error::CheckpointError;
use crate::CheckpointStore;

/// Watermarks held in memory. Clones share the same map, so a caller can
/// keep a handle and inspect what a consumer persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    entries: Arc<Mutex<BTreeMap<String, DateTime<Utc>>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of resources with a saved watermark.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self, resource: &str) -> Result<DateTime<Utc>, CheckpointError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CheckpointError::LockPoisoned)?;
        entries
            .get(resource)
            .copied()
            .ok_or_else(|| CheckpointError::NotFound(resource.to_string()))
    }

    fn save(&self, resource: &str, watermark: DateTime<Utc>) -> Result<(), CheckpointError> {
        self.entries
            .lock()
            .map_err(|_| CheckpointError::LockPoisoned)?
            .insert(resource.to_string(), watermark);
        Ok(())
    }
}
