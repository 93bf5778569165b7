//! Decoded point-in-time view of a repository's CI runs.
//!
//! The structs here deserialize directly from the GitHub Actions REST
//! payloads (`workflow_runs[]` and `jobs[]`). Unknown fields are ignored.
//! Timestamps that are `null` or an empty string decode to `None`; any other
//! value must be RFC 3339 or decoding fails.
//!
//! A run listing decodes entry by entry. A run that fails to decode is
//! dropped with a warning, and the rest of the listing is kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// A workflow run as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Run {
    /// Provider-assigned run identifier.
    pub id: u64,
    /// Workflow name.
    #[serde(default)]
    pub name: Option<String>,
    /// Branch the run was triggered for.
    #[serde(default)]
    pub head_branch: Option<String>,
    /// Commit the run was triggered for.
    #[serde(default)]
    pub head_sha: Option<String>,
    /// Current run status (`queued`, `in_progress`, `completed`, ...).
    #[serde(default)]
    pub status: Option<String>,
    /// When the run was created (queued).
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the current attempt started executing.
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub run_started_at: Option<DateTime<Utc>>,
    /// When the run last changed.
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A job within a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    /// Final outcome once completed (`success`, `failure`, ...).
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub steps: Vec<Step>,
}

/// A step within a job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// A run together with its job detail.
///
/// `jobs` is `None` when the job listing for this run could not be fetched.
/// The run's own timestamps are still usable in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSnapshot {
    pub run: Run,
    pub jobs: Option<Vec<Job>>,
}

/// The hierarchical state of one monitored repository for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub runs: Vec<RunSnapshot>,
}

/// Envelope of `GET /repos/{repo}/actions/runs`.
#[derive(Debug, Deserialize)]
pub struct RunList {
    #[serde(default, deserialize_with = "skip_undecodable_runs")]
    pub workflow_runs: Vec<Run>,
}

/// Envelope of `GET /repos/{repo}/actions/runs/{id}/jobs`.
#[derive(Debug, Deserialize)]
pub struct JobList {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|ts| Some(ts.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom),
    }
}

fn skip_undecodable_runs<'de, D>(deserializer: D) -> Result<Vec<Run>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| {
            let id = value.get("id").cloned();
            match Run::deserialize(value) {
                Ok(run) => Some(run),
                Err(e) => {
                    tracing::warn!(run_id = ?id, error = %e, "skipping undecodable run");
                    None
                }
            }
        })
        .collect())
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
