//! Source side of the reconciliation loop.

use std::future::Future;

use runwatch_types::{Job, Run, RunSnapshot, Snapshot};

/// Supplies the current CI state of a monitored resource.
///
/// # Completeness boundary
///
/// Implementations return only a bounded "most recently updated" window of
/// runs. A run that never appears inside that window between two cycles is
/// never observed. Job listings may be bounded the same way per run. The
/// reconciler does not paginate beyond what [`SnapshotProvider::fetch_runs`]
/// and [`SnapshotProvider::fetch_jobs`] return.
pub trait SnapshotProvider: Send + Sync {
    /// Error reported for a failed fetch.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists the most recent runs of `resource`.
    fn fetch_runs(
        &self,
        resource: &str,
    ) -> impl Future<Output = Result<Vec<Run>, Self::Error>> + Send;

    /// Lists the jobs (with steps) of one run.
    fn fetch_jobs(
        &self,
        resource: &str,
        run_id: u64,
    ) -> impl Future<Output = Result<Vec<Job>, Self::Error>> + Send;
}

/// Reads a full hierarchical snapshot of `resource`.
///
/// A failed run listing fails the whole snapshot. A failed job listing only
/// affects its own run: the run is kept with `jobs: None` and the remaining
/// runs are still fetched.
///
/// # Errors
///
/// Returns the provider's error if the run listing cannot be fetched.
pub async fn fetch_snapshot<P>(provider: &P, resource: &str) -> Result<Snapshot, P::Error>
where
    P: SnapshotProvider + ?Sized,
{
    let runs = provider.fetch_runs(resource).await?;
    let mut snapshot = Snapshot {
        runs: Vec::with_capacity(runs.len()),
    };

    for run in runs {
        let jobs = match provider.fetch_jobs(resource, run.id).await {
            Ok(jobs) => Some(jobs),
            Err(e) => {
                tracing::warn!(
                    resource,
                    run_id = run.id,
                    error = %e,
                    "job detail unavailable, keeping run-level events only"
                );
                None
            }
        };
        snapshot.runs.push(RunSnapshot { run, jobs });
    }

    Ok(snapshot)
}
