mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use common::{RecordingLauncher, name};
use mesh_harvester::domain::channel::protocol::CompletionReport;
use mesh_harvester::domain::dispatch::dispatcher::Dispatcher;
use mesh_harvester::domain::schedule::assess::AssessedAction;
use mesh_harvester::domain::schedule::entry::{Batch, OperationKind, ScheduleEntry};
use mesh_harvester::domain::utils::id::{ChannelId, WorkerPid};
use mesh_harvester::error::Error;

const OWNER: ChannelId = ChannelId(3);

fn entry(kind: OperationKind, start: i64, end: i64, cost: i64) -> ScheduleEntry {
    ScheduleEntry {
        target: name("t"),
        kind,
        owner: OWNER,
        expected_start: start,
        expected_end: end,
        threads: cost as u32,
        cost,
        batch_final: false,
    }
}

fn batch(entries: Vec<ScheduleEntry>) -> Batch {
    Batch::new(AssessedAction::Weaken, entries)
}

fn dispatcher(launcher: &Arc<RecordingLauncher>) -> Dispatcher {
    Dispatcher::new(launcher.clone(), name("t"))
}

#[test]
fn launches_track_and_release_capacity() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut dispatcher = dispatcher(&launcher);

    dispatcher.sync_capacity(100, 100);
    dispatcher.load_batch(batch(vec![entry(OperationKind::Weaken, 0, 4_000, 30), entry(OperationKind::Grow, 10, 3_210, 20)]));

    dispatcher.step(0).expect("both entries fit");
    assert_eq!(launcher.request_count(), 2);
    assert_eq!(dispatcher.running_count(), 2);
    assert!(!dispatcher.has_pending());

    // 50 free remains, a 60-cost entry must wait.
    dispatcher.load_batch(batch(vec![entry(OperationKind::Weaken, 20, 4_020, 60)]));
    dispatcher.step(0).expect("a transient shortfall is not an error");
    assert!(dispatcher.has_pending(), "the entry must stay queued");
    assert_eq!(launcher.request_count(), 2);

    // Reconciling the first worker frees its 30 again.
    let report = CompletionReport::done(WorkerPid(1), 0, 4_000);
    let landed = dispatcher.reconcile(report).expect("a clean completion").expect("a tracked entry");
    assert_eq!(landed.cost, 30);

    dispatcher.step(0).expect("now the entry fits");
    assert_eq!(launcher.request_count(), 3);
    assert!(!dispatcher.has_pending());
}

#[test]
fn impossible_entry_is_a_terminal_shortfall() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut dispatcher = dispatcher(&launcher);

    dispatcher.sync_capacity(40, 40);
    dispatcher.load_batch(batch(vec![entry(OperationKind::Weaken, 0, 4_000, 50)]));

    let result = dispatcher.step(0);
    assert!(
        matches!(result, Err(Error::CapacityShortfall { needed: 50, capacity: 40, .. })),
        "an entry above total capacity must be reported, got {:?}",
        result
    );
    assert!(!dispatcher.has_pending(), "the hopeless entry must not be retried forever");
    assert_eq!(launcher.request_count(), 0);
}

#[test]
fn terminal_shortfall_takes_the_batch_siblings_with_it() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut dispatcher = dispatcher(&launcher);

    dispatcher.sync_capacity(40, 40);
    dispatcher.load_batch(batch(vec![
        entry(OperationKind::Hack, 0, 1_000, 50),
        entry(OperationKind::Weaken, 5, 4_005, 10),
        entry(OperationKind::Grow, 10, 3_210, 10),
    ]));

    let result = dispatcher.step(0);
    assert!(matches!(result, Err(Error::CapacityShortfall { .. })));
    assert!(!dispatcher.has_pending(), "siblings of the unlaunchable entry must not run headless");
    assert_eq!(launcher.request_count(), 0, "no part of the broken batch may launch");
}

#[test]
fn failed_launch_is_never_retried() {
    let launcher = Arc::new(RecordingLauncher::new());
    launcher.fail.store(true, Ordering::Relaxed);
    let mut dispatcher = dispatcher(&launcher);

    dispatcher.sync_capacity(100, 100);
    dispatcher.load_batch(batch(vec![entry(OperationKind::Hack, 0, 1_000, 10)]));

    let result = dispatcher.step(0);
    assert!(matches!(result, Err(Error::DeliveryFailure(owner)) if owner == OWNER));
    assert_eq!(launcher.request_count(), 1);
    assert!(!dispatcher.has_pending());

    dispatcher.step(0).expect("nothing left to launch");
    assert_eq!(launcher.request_count(), 1, "the failed entry must be dispatched at most once");
}

#[test]
fn closed_window_is_shifted_off_unlaunched() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut dispatcher = dispatcher(&launcher);

    dispatcher.sync_capacity(100, 100);
    dispatcher.load_batch(batch(vec![entry(OperationKind::Hack, 0, 1_000, 10)]));

    dispatcher.step(1_000).expect("an expired entry is not an error");
    assert_eq!(launcher.request_count(), 0, "an entry whose end has passed must not be launched");
    assert!(!dispatcher.has_pending());
}

#[test]
fn unknown_worker_report_is_tolerated() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut dispatcher = dispatcher(&launcher);

    let outcome = dispatcher.reconcile(CompletionReport::done(WorkerPid(99), 0, 100));
    assert!(matches!(outcome, Ok(None)), "a stray report must be ignored, not fatal");
}

#[test]
fn worker_failure_report_forces_a_replan() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut dispatcher = dispatcher(&launcher);

    dispatcher.sync_capacity(100, 100);
    dispatcher.load_batch(batch(vec![entry(OperationKind::Grow, 0, 3_200, 10)]));
    dispatcher.step(0).expect("launch succeeds");

    let result = dispatcher.reconcile(CompletionReport::failed(WorkerPid(1)));
    assert!(matches!(result, Err(Error::DeliveryFailure(owner)) if owner == OWNER));
    assert_eq!(dispatcher.running_count(), 0, "the failed worker must no longer be tracked");
}

#[test]
fn launch_request_carries_the_landing_contract() {
    let launcher = Arc::new(RecordingLauncher::new());
    let mut dispatcher = dispatcher(&launcher);

    dispatcher.sync_capacity(100, 100);
    dispatcher.load_batch(batch(vec![entry(OperationKind::Weaken, 500, 4_500, 10)]));
    dispatcher.step(0).expect("launch succeeds");

    let requests = launcher.requests.lock().unwrap();
    assert_eq!(requests[0].expected_duration_ms, 4_000);
    assert_eq!(requests[0].expected_land, 4_500);
    assert_eq!(requests[0].report_to, OWNER);
}
