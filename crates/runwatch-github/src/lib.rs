//! GitHub Actions implementation of [`runwatch_engine::SnapshotProvider`].
//!
//! Two REST endpoints are used:
//!
//! - `GET /repos/{owner}/{repo}/actions/runs?per_page={window}` for the most
//!   recently updated runs
//! - `GET /repos/{owner}/{repo}/actions/runs/{run_id}/jobs?per_page=100` for
//!   the jobs and steps of one run
//!
//! Only the first page of each listing is read. `window` bounds how many runs
//! are visible per poll, and jobs beyond the 100th of a run are never seen.

mod client;
mod error;

pub use client::{GithubClient, GithubSettings, DEFAULT_API_URL};
pub use error::GithubError;
