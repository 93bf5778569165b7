//! TOML file backend.
//!
//! The file is a flat table of resource key to RFC 3339 string:
//!
//! ```toml
//! "octo/widgets" = "2024-05-01T10:00:00Z"
//! "octo/gadgets" = "2024-05-01T09:30:12.5Z"
//! ```
//!
//! Every save reads the whole document, replaces one entry, writes the result
//! to a sibling temp file and renames it over the target, so a crash mid
//! write leaves the previous document intact.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::CheckpointError;
use crate::{decode_instant, encode_instant, CheckpointStore};

const HEADER: &str = "# runwatch checkpoint state: resource -> last poll-cycle start\n";

/// Watermarks stored in a single TOML file, keyed by resource.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    /// Creates a store backed by `path`. The file is not touched until the
    /// first load or save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Option<BTreeMap<String, String>>, CheckpointError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CheckpointError::Io(e)),
        };

        toml::from_str(&contents)
            .map(Some)
            .map_err(|e| CheckpointError::Parse(e.to_string()))
    }

    fn write_document(&self, document: &BTreeMap<String, String>) -> Result<(), CheckpointError> {
        let body = toml::to_string(document)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.temp_path();
        std::fs::write(&tmp, format!("{HEADER}{body}"))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(CheckpointError::Io(e));
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self, resource: &str) -> Result<DateTime<Utc>, CheckpointError> {
        let document = self
            .read_document()?
            .ok_or_else(|| CheckpointError::NotFound(resource.to_string()))?;

        match document.get(resource) {
            Some(raw) => decode_instant(raw),
            None => Err(CheckpointError::NotFound(resource.to_string())),
        }
    }

    fn save(&self, resource: &str, watermark: DateTime<Utc>) -> Result<(), CheckpointError> {
        let mut document = match self.read_document() {
            Ok(existing) => existing.unwrap_or_default(),
            Err(CheckpointError::Parse(reason)) => {
                tracing::warn!(
                    path = %self.path.display(),
                    %reason,
                    "checkpoint file is corrupt, replacing it"
                );
                BTreeMap::new()
            }
            Err(e) => return Err(e),
        };

        document.insert(resource.to_string(), encode_instant(watermark));
        self.write_document(&document)
    }
}
