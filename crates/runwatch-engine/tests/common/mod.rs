//! Shared fixtures for reconciliation tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use runwatch_checkpoint::{CheckpointError, CheckpointStore};
use runwatch_engine::{Clock, SnapshotProvider};
use runwatch_types::{Job, Run, Step};

pub const RESOURCE: &str = "octo/widgets";

/// Base instant for fixtures; `t(n)` is `n` seconds after it.
pub fn t(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + Duration::seconds(secs)
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct FakeError(pub String);

/// Provider whose visible state the test mutates between cycles.
#[derive(Clone, Default)]
pub struct FakeProvider {
    runs: Arc<Mutex<Vec<Run>>>,
    jobs: Arc<Mutex<HashMap<u64, Result<Vec<Job>, String>>>>,
    fail_listing: Arc<AtomicBool>,
    listings: Arc<AtomicUsize>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_runs(&self, runs: Vec<Run>) {
        *self.runs.lock().unwrap() = runs;
    }

    pub fn set_jobs(&self, run_id: u64, jobs: Vec<Job>) {
        self.jobs.lock().unwrap().insert(run_id, Ok(jobs));
    }

    pub fn fail_jobs(&self, run_id: u64, reason: &str) {
        self.jobs
            .lock()
            .unwrap()
            .insert(run_id, Err(reason.to_string()));
    }

    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Number of run listings requested so far.
    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }
}

impl SnapshotProvider for FakeProvider {
    type Error = FakeError;

    async fn fetch_runs(&self, _resource: &str) -> Result<Vec<Run>, FakeError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(FakeError("connection reset".to_string()));
        }
        Ok(self.runs.lock().unwrap().clone())
    }

    async fn fetch_jobs(&self, _resource: &str, run_id: u64) -> Result<Vec<Job>, FakeError> {
        match self.jobs.lock().unwrap().get(&run_id) {
            Some(Ok(jobs)) => Ok(jobs.clone()),
            Some(Err(reason)) => Err(FakeError(reason.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// Provider whose listing never completes.
#[derive(Clone, Default)]
pub struct StalledProvider {
    pub listings: Arc<AtomicUsize>,
}

impl SnapshotProvider for StalledProvider {
    type Error = FakeError;

    async fn fetch_runs(&self, _resource: &str) -> Result<Vec<Run>, FakeError> {
        self.listings.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn fetch_jobs(&self, _resource: &str, _run_id: u64) -> Result<Vec<Job>, FakeError> {
        Ok(Vec::new())
    }
}

/// Clock the test moves by hand.
#[derive(Clone)]
pub struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(instant)))
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.0.lock().unwrap() = instant;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Store whose reads and writes always fail.
#[derive(Clone, Default)]
pub struct BrokenStore {
    pub save_attempts: Arc<AtomicUsize>,
}

impl CheckpointStore for BrokenStore {
    fn load(&self, _resource: &str) -> Result<DateTime<Utc>, CheckpointError> {
        Err(CheckpointError::Parse("garbled".to_string()))
    }

    fn save(&self, _resource: &str, _watermark: DateTime<Utc>) -> Result<(), CheckpointError> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        Err(CheckpointError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only filesystem",
        )))
    }
}

pub fn run_with(id: u64, name: &str) -> Run {
    Run {
        id,
        name: Some(name.to_string()),
        head_branch: Some("main".to_string()),
        head_sha: Some("0123456789abcdef".to_string()),
        status: None,
        created_at: None,
        run_started_at: None,
        updated_at: None,
    }
}

pub fn job_with(name: &str, started: i64, completed: Option<(i64, &str)>, steps: Vec<Step>) -> Job {
    Job {
        id: 0,
        name: Some(name.to_string()),
        status: None,
        conclusion: completed.map(|(_, c)| c.to_string()),
        started_at: Some(t(started)),
        completed_at: completed.map(|(at, _)| t(at)),
        steps,
    }
}

pub fn step_with(name: &str, started: i64, completed: Option<(i64, &str)>) -> Step {
    Step {
        name: Some(name.to_string()),
        status: None,
        conclusion: completed.map(|(_, c)| c.to_string()),
        started_at: Some(t(started)),
        completed_at: completed.map(|(at, _)| t(at)),
    }
}
