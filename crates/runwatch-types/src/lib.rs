//! Shared types for the runwatch workspace.
//!
//! This crate holds the data model every other crate agrees on: the
//! hierarchy levels of a CI run, the closed status taxonomy delivered to
//! sinks, the immutable [`Event`] record, and the decoded [`Snapshot`] of a
//! monitored repository.
//!
//! Nothing here performs I/O. Crates that fetch, persist, or present state
//! depend on `runwatch-types` and never on each other for these definitions.

use serde::{Deserialize, Serialize};

mod event;
mod snapshot;

pub use event::Event;
pub use snapshot::{Job, JobList, Run, RunList, RunSnapshot, Snapshot, Step};

/// Hierarchy level an [`Event`] was observed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// A workflow run, the top-level triggered execution.
    Workflow,
    /// A job inside a run.
    Job,
    /// A step inside a job.
    Step,
}

impl EntityType {
    /// Returns the full label for this level.
    pub fn label(self) -> &'static str {
        match self {
            Self::Workflow => "Workflow",
            Self::Job => "Job",
            Self::Step => "Step",
        }
    }

    /// Returns the label truncated to at most four characters, for table columns.
    pub fn short_label(self) -> &'static str {
        match self {
            Self::Workflow => "Work",
            Self::Job => "Job",
            Self::Step => "Step",
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Normalized status taxonomy.
///
/// Raw status and conclusion strings from the CI provider are mapped onto
/// this closed set so sinks never need the provider's vocabulary. Tokens the
/// taxonomy does not know are carried verbatim in [`Status::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// `success` or `completed`.
    Done,
    /// `failure` or `timed_out`.
    Fail,
    /// `in_progress` or `running`.
    Running,
    /// `queued`.
    Queued,
    /// `skipped` or `cancelled`.
    Skipped,
    /// Any other token, kept as reported.
    Unknown(String),
}

impl Status {
    /// Maps a raw provider token onto the taxonomy. Matching ignores case.
    pub fn normalize(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "success" | "completed" => Self::Done,
            "failure" | "timed_out" => Self::Fail,
            "in_progress" | "running" => Self::Running,
            "queued" => Self::Queued,
            "skipped" | "cancelled" => Self::Skipped,
            _ => Self::Unknown(raw.to_string()),
        }
    }

    /// Like [`Status::normalize`], treating a missing token as `unknown`.
    pub fn from_optional(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) => Self::normalize(raw),
            None => Self::Unknown("unknown".to_string()),
        }
    }

    /// Returns the taxonomy token, or the raw token for [`Status::Unknown`].
    pub fn as_str(&self) -> &str {
        match self {
            Self::Done => "done",
            Self::Fail => "fail",
            Self::Running => "running",
            Self::Queued => "queued",
            Self::Skipped => "skipped",
            Self::Unknown(raw) => raw,
        }
    }

    /// Returns the short display code (`DONE`, `FAIL`, `RUN`, `QUEUE`, `SKIP`).
    ///
    /// Unknown tokens are uppercased and cut to four characters.
    pub fn short_code(&self) -> String {
        match self {
            Self::Done => "DONE".to_string(),
            Self::Fail => "FAIL".to_string(),
            Self::Running => "RUN".to_string(),
            Self::Queued => "QUEUE".to_string(),
            Self::Skipped => "SKIP".to_string(),
            Self::Unknown(raw) => raw.to_uppercase().chars().take(4).collect(),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
