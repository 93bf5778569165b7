//! The immutable state-transition record delivered to sinks.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{EntityType, Status};

/// One observed state transition of a run, job, or step.
///
/// The timestamp is the one reported by the CI provider, never a local
/// reading; ordering and watermark comparisons use it exclusively. Fields are
/// private so an event cannot change after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    timestamp: DateTime<Utc>,
    entity_type: EntityType,
    status: Status,
    branch: Option<String>,
    commit_sha: Option<String>,
    name: String,
}

impl Event {
    /// Creates a new event.
    pub fn new(
        timestamp: DateTime<Utc>,
        entity_type: EntityType,
        status: Status,
        branch: Option<String>,
        commit_sha: Option<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            entity_type,
            status,
            branch,
            commit_sha,
            name: name.into(),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Head branch of the owning run, if the provider reported one.
    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Head commit of the owning run, if the provider reported one.
    pub fn commit_sha(&self) -> Option<&str> {
        self.commit_sha.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
