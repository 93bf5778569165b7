//! Snapshot to event conversion, and the watermark filter.

use chrono::{DateTime, Utc};
use runwatch_types::{EntityType, Event, Job, RunSnapshot, Snapshot, Status};

/// Converts a snapshot into one event per populated timestamp field.
///
/// | Level | Field | Status |
/// |-------|-------|--------|
/// | run | `created_at` | queued |
/// | run | `run_started_at` | running |
/// | run | `updated_at` | run status |
/// | job / step | `started_at` | running |
/// | job / step | `completed_at` | conclusion |
///
/// Absent fields produce nothing. Events come out in discovery order: runs
/// in listing order, each run followed by its jobs, each job followed by its
/// steps. The function is pure; it knows nothing about what was delivered
/// before.
pub fn extract(snapshot: &Snapshot) -> Vec<Event> {
    let mut events = Vec::new();
    for entry in &snapshot.runs {
        extract_run(entry, &mut events);
    }
    events
}

/// Keeps the events strictly newer than `watermark`, oldest first.
///
/// The sort is stable, so events sharing a timestamp keep discovery order.
pub fn select_pending(mut events: Vec<Event>, watermark: DateTime<Utc>) -> Vec<Event> {
    events.retain(|event| event.timestamp() > watermark);
    events.sort_by_key(Event::timestamp);
    events
}

fn extract_run(entry: &RunSnapshot, events: &mut Vec<Event>) {
    let run = &entry.run;
    let mut out = Emitter {
        events,
        branch: run.head_branch.as_deref(),
        commit_sha: run.head_sha.as_deref(),
    };
    let name = run.name.as_deref();

    out.emit(run.created_at, EntityType::Workflow, Status::Queued, name);
    out.emit(run.run_started_at, EntityType::Workflow, Status::Running, name);
    out.emit(
        run.updated_at,
        EntityType::Workflow,
        Status::from_optional(run.status.as_deref()),
        name,
    );

    for job in entry.jobs.iter().flatten() {
        extract_job(job, &mut out);
    }
}

fn extract_job(job: &Job, out: &mut Emitter<'_>) {
    let name = job.name.as_deref();
    out.emit(job.started_at, EntityType::Job, Status::Running, name);
    out.emit(
        job.completed_at,
        EntityType::Job,
        Status::from_optional(job.conclusion.as_deref()),
        name,
    );

    for step in &job.steps {
        let name = step.name.as_deref();
        out.emit(step.started_at, EntityType::Step, Status::Running, name);
        out.emit(
            step.completed_at,
            EntityType::Step,
            Status::from_optional(step.conclusion.as_deref()),
            name,
        );
    }
}

/// Appends events that share the owning run's branch and commit.
struct Emitter<'a> {
    events: &'a mut Vec<Event>,
    branch: Option<&'a str>,
    commit_sha: Option<&'a str>,
}

impl Emitter<'_> {
    fn emit(
        &mut self,
        at: Option<DateTime<Utc>>,
        entity_type: EntityType,
        status: Status,
        name: Option<&str>,
    ) {
        let Some(timestamp) = at else {
            return;
        };
        self.events.push(Event::new(
            timestamp,
            entity_type,
            status,
            self.branch.map(str::to_owned),
            self.commit_sha.map(str::to_owned),
            name.unwrap_or_default(),
        ));
    }
}
