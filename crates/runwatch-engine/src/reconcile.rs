//! The polling loop: fetch, extract, filter, deliver, checkpoint, sleep.

use std::time::Duration;

use chrono::{DateTime, Utc};
use runwatch_checkpoint::CheckpointStore;
use tokio::sync::watch;

use crate::clock::Clock;
use crate::extract::{extract, select_pending};
use crate::provider::{fetch_snapshot, SnapshotProvider};
use crate::sink::EventSink;

/// Timing of the reconciliation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Pause after a successful cycle.
    pub interval: Duration,
    /// Pause after a failed fetch.
    pub backoff: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            backoff: Duration::from_secs(5),
        }
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Instant recorded before the fetch started.
    pub cycle_start: DateTime<Utc>,
    /// Runs in the fetched window.
    pub fetched_runs: usize,
    /// Events extracted from the snapshot, before filtering.
    pub extracted: usize,
    /// Events handed to the sink.
    pub delivered: usize,
    /// Watermark after the cycle.
    pub watermark: DateTime<Utc>,
    /// Whether the watermark reached the checkpoint store.
    pub persisted: bool,
}

/// Drives reconciliation cycles for a single resource.
pub struct Reconciler<P, C, K, T> {
    resource: String,
    provider: P,
    store: C,
    sink: K,
    clock: T,
    settings: PollSettings,
    watermark: DateTime<Utc>,
}

impl<P, C, K, T> Reconciler<P, C, K, T>
where
    P: SnapshotProvider,
    C: CheckpointStore,
    K: EventSink,
    T: Clock,
{
    /// Creates a reconciler and resolves its starting watermark.
    ///
    /// A persisted watermark is resumed. Without one (or if it cannot be
    /// read) the watermark starts at `clock.now()`, so nothing that happened
    /// before startup is delivered.
    pub fn new(
        resource: impl Into<String>,
        provider: P,
        store: C,
        sink: K,
        clock: T,
        settings: PollSettings,
    ) -> Self {
        let resource = resource.into();
        let watermark = match store.load(&resource) {
            Ok(watermark) => {
                tracing::info!(resource = %resource, %watermark, "resuming from checkpoint");
                watermark
            }
            Err(e) if e.is_not_found() => {
                let now = clock.now();
                tracing::info!(resource = %resource, watermark = %now, "no checkpoint, starting live");
                now
            }
            Err(e) => {
                let now = clock.now();
                tracing::warn!(
                    resource = %resource,
                    error = %e,
                    watermark = %now,
                    "could not load checkpoint, starting live"
                );
                now
            }
        };

        Self {
            resource,
            provider,
            store,
            sink,
            clock,
            settings,
            watermark,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Current in-memory watermark.
    pub fn watermark(&self) -> DateTime<Utc> {
        self.watermark
    }

    /// Runs exactly one reconciliation cycle.
    ///
    /// The fetch is the only suspension point. Once it returns, extraction,
    /// delivery and checkpointing complete without yielding, so dropping this
    /// future can only abandon a cycle that has not delivered anything.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the run listing cannot be fetched. The
    /// watermark is left untouched in that case.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, P::Error> {
        let cycle_start = self.clock.now();
        let snapshot = fetch_snapshot(&self.provider, &self.resource).await?;

        let events = extract(&snapshot);
        let extracted = events.len();
        let pending = select_pending(events, self.watermark);

        for event in &pending {
            self.sink.deliver(event);
        }

        self.watermark = self.watermark.max(cycle_start);
        let persisted = self.persist();

        Ok(CycleReport {
            cycle_start,
            fetched_runs: snapshot.runs.len(),
            extracted,
            delivered: pending.len(),
            watermark: self.watermark,
            persisted,
        })
    }

    /// Runs cycles until `shutdown` turns `true` (or its sender is dropped).
    ///
    /// Cancellation is observed before each cycle, while fetching, and while
    /// sleeping. The watermark is persisted once more before returning, and
    /// the final watermark is returned.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> DateTime<Utc> {
        tracing::info!(
            resource = %self.resource,
            watermark = %self.watermark,
            interval_ms = self.settings.interval.as_millis() as u64,
            "starting reconciliation loop"
        );

        loop {
            if is_cancelled(&shutdown) {
                break;
            }

            let pause = tokio::select! {
                biased;
                () = cancelled(&mut shutdown) => break,
                result = self.run_cycle() => match result {
                    Ok(report) => {
                        tracing::debug!(
                            resource = %self.resource,
                            runs = report.fetched_runs,
                            extracted = report.extracted,
                            delivered = report.delivered,
                            watermark = %report.watermark,
                            "reconciliation cycle complete"
                        );
                        self.settings.interval
                    }
                    Err(e) => {
                        tracing::warn!(
                            resource = %self.resource,
                            error = %e,
                            backoff_ms = self.settings.backoff.as_millis() as u64,
                            "failed to poll CI provider"
                        );
                        self.settings.backoff
                    }
                },
            };

            tokio::select! {
                biased;
                () = cancelled(&mut shutdown) => break,
                () = tokio::time::sleep(pause) => {}
            }
        }

        self.persist();
        tracing::info!(
            resource = %self.resource,
            watermark = %self.watermark,
            "reconciliation loop stopped"
        );
        self.watermark
    }

    fn persist(&self) -> bool {
        match self.store.save(&self.resource, self.watermark) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    resource = %self.resource,
                    error = %e,
                    "failed to persist checkpoint"
                );
                false
            }
        }
    }
}

fn is_cancelled(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow() || shutdown.has_changed().is_err()
}

/// Resolves once a stop has been requested or can no longer be requested.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
