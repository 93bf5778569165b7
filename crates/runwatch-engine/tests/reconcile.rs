//! Reconciliation cycle and loop behaviour.
//!
//! Covers:
//! - empty windows still advance the watermark
//! - events stamped after a cycle began are delivered again next cycle
//! - only events newer than the watermark are delivered, oldest first
//! - a failed job listing isolates to its own run
//! - restarts resume from the persisted watermark
//! - failed fetches and failed saves never stop the loop
//! - cancellation during sleep, during a fetch, and before the first cycle

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::*;
use runwatch_checkpoint::{CheckpointStore, MemoryCheckpointStore};
use runwatch_engine::{MemorySink, PollSettings, Reconciler, SystemClock};
use runwatch_types::{EntityType, Event, Status};
use tokio::sync::watch;

fn described(events: &[Event]) -> Vec<(i64, EntityType, Status)> {
    events
        .iter()
        .map(|e| {
            (
                (e.timestamp() - t(0)).num_seconds(),
                e.entity_type(),
                e.status().clone(),
            )
        })
        .collect()
}

fn seeded_store(watermark_secs: i64) -> MemoryCheckpointStore {
    let store = MemoryCheckpointStore::new();
    store.save(RESOURCE, t(watermark_secs)).unwrap();
    store
}

#[tokio::test]
async fn empty_window_delivers_nothing_and_advances_watermark() {
    let provider = FakeProvider::new();
    let store = seeded_store(0);
    let sink = MemorySink::new();
    let clock = ManualClock::at(t(30));

    let mut reconciler = Reconciler::new(
        RESOURCE,
        provider,
        store.clone(),
        sink.clone(),
        clock,
        PollSettings::default(),
    );

    let report = reconciler.run_cycle().await.expect("cycle should succeed");

    assert_eq!(report.delivered, 0);
    assert_eq!(report.cycle_start, t(30));
    assert_eq!(report.watermark, t(30));
    assert!(report.persisted);
    assert!(sink.events().is_empty());
    assert_eq!(store.load(RESOURCE).unwrap(), t(30));
}

#[tokio::test]
async fn new_run_yields_queued_then_running() {
    let provider = FakeProvider::new();
    let mut run = run_with(1, "CI");
    run.created_at = Some(t(0));
    run.run_started_at = Some(t(4));
    run.status = Some("in_progress".to_string());
    provider.set_runs(vec![run]);

    let store = seeded_store(-1);
    let sink = MemorySink::new();
    let mut reconciler = Reconciler::new(
        RESOURCE,
        provider,
        store,
        sink.clone(),
        ManualClock::at(t(10)),
        PollSettings::default(),
    );

    let report = reconciler.run_cycle().await.unwrap();

    assert_eq!(report.delivered, 2);
    assert_eq!(
        described(&sink.events()),
        vec![
            (0, EntityType::Workflow, Status::Queued),
            (4, EntityType::Workflow, Status::Running),
        ]
    );
}

#[tokio::test]
async fn failed_job_listing_keeps_run_events_and_other_runs() {
    let provider = FakeProvider::new();

    let mut broken = run_with(1, "broken");
    broken.created_at = Some(t(1));
    broken.run_started_at = Some(t(2));
    broken.updated_at = Some(t(3));
    broken.status = Some("in_progress".to_string());
    provider.fail_jobs(1, "502 Bad Gateway");

    let mut healthy = run_with(2, "healthy");
    healthy.created_at = Some(t(5));
    provider.set_jobs(
        2,
        vec![job_with(
            "build",
            6,
            Some((9, "success")),
            vec![step_with("checkout", 7, Some((8, "success")))],
        )],
    );
    provider.set_runs(vec![broken, healthy]);

    let sink = MemorySink::new();
    let mut reconciler = Reconciler::new(
        RESOURCE,
        provider,
        seeded_store(0),
        sink.clone(),
        ManualClock::at(t(20)),
        PollSettings::default(),
    );

    let report = reconciler.run_cycle().await.unwrap();
    let events = sink.events();

    assert_eq!(report.fetched_runs, 2);
    let broken_events: Vec<_> = events.iter().filter(|e| e.name() == "broken").collect();
    assert_eq!(broken_events.len(), 3);
    assert!(broken_events
        .iter()
        .all(|e| e.entity_type() == EntityType::Workflow));

    assert_eq!(
        described(&events[3..]),
        vec![
            (5, EntityType::Workflow, Status::Queued),
            (6, EntityType::Job, Status::Running),
            (7, EntityType::Step, Status::Running),
            (8, EntityType::Step, Status::Done),
            (9, EntityType::Job, Status::Done),
        ]
    );
}

#[tokio::test]
async fn restart_replays_everything_after_persisted_watermark_once() {
    let provider = FakeProvider::new();
    let mut run = run_with(1, "CI");
    run.created_at = Some(t(10));
    run.run_started_at = Some(t(12));
    run.updated_at = Some(t(40));
    run.status = Some("completed".to_string());
    provider.set_runs(vec![run]);
    provider.set_jobs(1, vec![job_with("build", 13, Some((39, "failure")), vec![])]);

    // Persisted by a previous process, older than anything visible.
    let store = seeded_store(0);
    let sink = MemorySink::new();
    let clock = ManualClock::at(t(100));
    let mut reconciler = Reconciler::new(
        RESOURCE,
        provider,
        store.clone(),
        sink.clone(),
        clock.clone(),
        PollSettings::default(),
    );
    assert_eq!(reconciler.watermark(), t(0));

    reconciler.run_cycle().await.unwrap();
    assert_eq!(
        described(&sink.drain()),
        vec![
            (10, EntityType::Workflow, Status::Queued),
            (12, EntityType::Workflow, Status::Running),
            (13, EntityType::Job, Status::Running),
            (39, EntityType::Job, Status::Fail),
            (40, EntityType::Workflow, Status::Done),
        ]
    );

    clock.set(t(110));
    let second = reconciler.run_cycle().await.unwrap();
    assert_eq!(second.delivered, 0, "nothing may be delivered twice");
    assert_eq!(store.load(RESOURCE).unwrap(), t(110));
}

#[tokio::test]
async fn later_cycles_deliver_only_new_transitions() {
    let provider = FakeProvider::new();
    let store = seeded_store(0);
    let sink = MemorySink::new();
    let clock = ManualClock::at(t(10));

    let mut run = run_with(1, "CI");
    run.created_at = Some(t(5));
    provider.set_runs(vec![run.clone()]);

    let mut reconciler = Reconciler::new(
        RESOURCE,
        provider.clone(),
        store,
        sink.clone(),
        clock.clone(),
        PollSettings::default(),
    );
    reconciler.run_cycle().await.unwrap();
    assert_eq!(sink.drain().len(), 1);

    // The run starts and a job begins between the two polls.
    run.run_started_at = Some(t(15));
    run.updated_at = Some(t(16));
    run.status = Some("in_progress".to_string());
    provider.set_runs(vec![run]);
    provider.set_jobs(1, vec![job_with("build", 17, None, vec![])]);
    clock.set(t(20));

    let report = reconciler.run_cycle().await.unwrap();
    assert_eq!(report.extracted, 4);
    assert_eq!(
        described(&sink.events()),
        vec![
            (15, EntityType::Workflow, Status::Running),
            (16, EntityType::Workflow, Status::Running),
            (17, EntityType::Job, Status::Running),
        ]
    );
    assert!(sink.events().iter().all(|e| e.timestamp() > t(10)));
}

#[tokio::test]
async fn failed_listing_leaves_watermark_untouched() {
    let provider = FakeProvider::new();
    provider.fail_listing(true);
    let store = seeded_store(0);
    let clock = ManualClock::at(t(50));

    let mut reconciler = Reconciler::new(
        RESOURCE,
        provider,
        store.clone(),
        MemorySink::new(),
        clock,
        PollSettings::default(),
    );

    let err = reconciler.run_cycle().await.expect_err("listing fails");
    assert_eq!(err.to_string(), "connection reset");
    assert_eq!(reconciler.watermark(), t(0));
    assert_eq!(store.load(RESOURCE).unwrap(), t(0));
}

#[tokio::test]
async fn watermark_never_moves_backwards() {
    let provider = FakeProvider::new();
    let store = seeded_store(100);
    let clock = ManualClock::at(t(50));

    let mut reconciler = Reconciler::new(
        RESOURCE,
        provider,
        store.clone(),
        MemorySink::new(),
        clock.clone(),
        PollSettings::default(),
    );

    let mut previous = reconciler.watermark();
    for now in [50, 120, 90, 130] {
        clock.set(t(now));
        let report = reconciler.run_cycle().await.unwrap();
        assert!(report.watermark >= previous);
        previous = report.watermark;
    }
    assert_eq!(previous, t(130));
    assert_eq!(store.load(RESOURCE).unwrap(), t(130));
}

#[tokio::test]
async fn missing_checkpoint_starts_live() {
    let provider = FakeProvider::new();
    let mut run = run_with(1, "CI");
    run.created_at = Some(t(5));
    provider.set_runs(vec![run]);

    let store = MemoryCheckpointStore::new();
    let sink = MemorySink::new();
    let clock = ManualClock::at(t(60));
    let mut reconciler = Reconciler::new(
        RESOURCE,
        provider,
        store,
        sink.clone(),
        clock,
        PollSettings::default(),
    );

    assert_eq!(reconciler.watermark(), t(60));
    reconciler.run_cycle().await.unwrap();
    assert!(sink.events().is_empty(), "history before startup is not replayed");
}

#[tokio::test]
async fn unreadable_checkpoint_starts_live_and_save_failure_is_not_fatal() {
    let provider = FakeProvider::new();
    let mut run = run_with(1, "CI");
    run.created_at = Some(t(65));
    provider.set_runs(vec![run]);

    let store = BrokenStore::default();
    let sink = MemorySink::new();
    let clock = ManualClock::at(t(60));
    let mut reconciler = Reconciler::new(
        RESOURCE,
        provider,
        store.clone(),
        sink.clone(),
        clock.clone(),
        PollSettings::default(),
    );
    assert_eq!(reconciler.watermark(), t(60));

    clock.set(t(70));
    let report = reconciler.run_cycle().await.expect("save failure is not a cycle failure");
    assert!(!report.persisted);
    assert_eq!(report.delivered, 1);
    assert_eq!(reconciler.watermark(), t(70), "in-memory watermark still advances");

    clock.set(t(80));
    let report = reconciler.run_cycle().await.unwrap();
    assert_eq!(report.delivered, 0);
    assert_eq!(store.save_attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_sleep_exits_and_keeps_watermark() {
    let provider = FakeProvider::new();
    let store = seeded_store(0);
    let clock = ManualClock::at(t(30));
    let reconciler = Reconciler::new(
        RESOURCE,
        provider.clone(),
        store.clone(),
        MemorySink::new(),
        clock,
        PollSettings::default(),
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(reconciler.run(stop_rx));

    // First cycle runs immediately; the loop is now in its 10s sleep.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(provider.listings(), 1);

    stop_tx.send(true).unwrap();
    let final_watermark = handle.await.expect("loop should not panic");

    assert_eq!(final_watermark, t(30));
    assert_eq!(provider.listings(), 1, "no new fetch after cancellation");
    assert_eq!(store.load(RESOURCE).unwrap(), t(30));
}

#[tokio::test(start_paused = true)]
async fn loop_polls_on_interval_and_backs_off_after_failure() {
    let provider = FakeProvider::new();
    provider.fail_listing(true);
    let store = seeded_store(0);
    let clock = ManualClock::at(t(30));
    let settings = PollSettings {
        interval: Duration::from_secs(10),
        backoff: Duration::from_secs(5),
    };
    let reconciler = Reconciler::new(
        RESOURCE,
        provider.clone(),
        store.clone(),
        MemorySink::new(),
        clock.clone(),
        settings,
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(reconciler.run(stop_rx));

    // t=0 fails; retried after the 5s backoff.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(provider.listings(), 1);
    assert_eq!(store.load(RESOURCE).unwrap(), t(0));

    provider.fail_listing(false);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(provider.listings(), 2);
    assert_eq!(store.load(RESOURCE).unwrap(), t(30));

    // Next poll is a full interval later (t=15), not a backoff later.
    clock.set(t(45));
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(provider.listings(), 2);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(provider.listings(), 3);
    assert_eq!(store.load(RESOURCE).unwrap(), t(45));

    stop_tx.send(true).unwrap();
    assert_eq!(handle.await.unwrap(), t(45));
}

#[tokio::test(start_paused = true)]
async fn cancel_during_stalled_fetch_exits_without_advancing() {
    let provider = StalledProvider::default();
    let store = seeded_store(0);
    let reconciler = Reconciler::new(
        RESOURCE,
        provider.clone(),
        store.clone(),
        MemorySink::new(),
        ManualClock::at(t(30)),
        PollSettings::default(),
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(reconciler.run(stop_rx));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(provider.listings.load(Ordering::SeqCst), 1);

    stop_tx.send(true).unwrap();
    let final_watermark = handle.await.unwrap();

    assert_eq!(final_watermark, t(0));
    assert_eq!(store.load(RESOURCE).unwrap(), t(0));
}

#[tokio::test]
async fn stop_requested_before_start_skips_fetching() {
    let provider = FakeProvider::new();
    let store = MemoryCheckpointStore::new();
    let reconciler = Reconciler::new(
        RESOURCE,
        provider.clone(),
        store.clone(),
        MemorySink::new(),
        SystemClock,
        PollSettings::default(),
    );
    let initial = reconciler.watermark();

    let (stop_tx, stop_rx) = watch::channel(true);
    let final_watermark = reconciler.run(stop_rx).await;
    drop(stop_tx);

    assert_eq!(provider.listings(), 0);
    assert_eq!(final_watermark, initial);
    assert_eq!(store.load(RESOURCE).unwrap(), initial);
}

#[tokio::test]
async fn dropped_stop_sender_ends_the_loop() {
    let provider = FakeProvider::new();
    let reconciler = Reconciler::new(
        RESOURCE,
        provider.clone(),
        MemoryCheckpointStore::new(),
        MemorySink::new(),
        SystemClock,
        PollSettings::default(),
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    drop(stop_tx);

    tokio::time::timeout(Duration::from_secs(2), reconciler.run(stop_rx))
        .await
        .expect("loop should stop once nobody can signal it");
    assert_eq!(provider.listings(), 0);
}

#[tokio::test]
async fn event_stamped_after_cycle_start_is_delivered_twice() {
    let provider = FakeProvider::new();
    let mut run = run_with(1, "CI");
    run.created_at = Some(t(12));
    provider.set_runs(vec![run]);

    let store = seeded_store(0);
    let sink = MemorySink::new();
    let clock = ManualClock::at(t(10));
    let mut reconciler = Reconciler::new(
        RESOURCE,
        provider,
        store.clone(),
        sink.clone(),
        clock.clone(),
        PollSettings::default(),
    );

    let first = reconciler.run_cycle().await.unwrap();
    assert_eq!(first.delivered, 1);
    assert_eq!(first.watermark, t(10));

    clock.set(t(20));
    let second = reconciler.run_cycle().await.unwrap();
    assert_eq!(second.delivered, 1);
    assert_eq!(second.watermark, t(20));

    clock.set(t(30));
    let third = reconciler.run_cycle().await.unwrap();
    assert_eq!(third.delivered, 0);

    assert_eq!(
        described(&sink.events()),
        vec![
            (12, EntityType::Workflow, Status::Queued),
            (12, EntityType::Workflow, Status::Queued),
        ]
    );
}
