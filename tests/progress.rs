// tests/progress.rs

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::Arc;

use simplemr::demo::{SentenceLength, sample};
use simplemr::engine::Collector;
use simplemr::exec::BackendKind;
use simplemr::progress::{ProgressSnapshot, ProgressTracker};
use simplemr::types::ProgressDisplay;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn registered_job_starts_at_zero() {
    let tracker = ProgressTracker::hidden();
    let handle = tracker.register("job", 4);

    assert_eq!(handle.label(), "job");
    assert_eq!(handle.completed(), 0);
    assert_eq!(handle.total(), 4);
    assert!(!handle.snapshot().is_complete());
}

#[test]
fn advance_counts_up_to_total() {
    let tracker = ProgressTracker::hidden();
    let mut handle = tracker.register("job", 3);

    tracker.advance(&mut handle, 1);
    tracker.advance(&mut handle, 2);

    assert_eq!(
        handle.snapshot(),
        ProgressSnapshot {
            completed: 3,
            total: 3
        }
    );
}

#[test]
fn advance_past_total_is_clamped() {
    init_tracing();

    let tracker = ProgressTracker::hidden();
    let mut handle = tracker.register("job", 2);

    tracker.advance(&mut handle, 5);
    tracker.advance(&mut handle, 1);

    assert_eq!(handle.completed(), 2);
    let snapshot = handle.finish();
    assert!(snapshot.is_complete());
}

#[test]
fn each_registration_gets_a_fresh_id() {
    let tracker = ProgressTracker::hidden();
    let first = tracker.register("a", 1);
    let second = tracker.register("b", 1);

    assert_ne!(first.id(), second.id());
    assert!(second.id() > first.id());
    assert!(first.id().to_string().starts_with("job-"));
}

#[test]
fn zero_item_job_is_complete_immediately() {
    let tracker = ProgressTracker::hidden();
    let handle = tracker.register("empty", 0);
    assert!(handle.snapshot().is_complete());
}

#[test]
fn display_mode_is_kept() {
    assert_eq!(ProgressTracker::hidden().display(), ProgressDisplay::Hidden);
    assert_eq!(
        ProgressTracker::new(ProgressDisplay::Stderr).display(),
        ProgressDisplay::Stderr
    );
}

#[tokio::test]
async fn jobs_sharing_a_tracker_each_finish_complete() -> TestResult {
    init_tracing();

    let tracker = Arc::new(ProgressTracker::hidden());

    let first = Collector::new(sample(2), SentenceLength, 2, BackendKind::Thread)?
        .with_label("first")
        .with_progress(Arc::clone(&tracker));
    let second = Collector::new(sample(3), SentenceLength, 3, BackendKind::Thread)?
        .with_label("second")
        .with_progress(Arc::clone(&tracker));

    let (a, b) = tokio::try_join!(first.collect_with_summary(), second.collect_with_summary())?;

    assert_eq!(
        a.progress,
        ProgressSnapshot {
            completed: 8,
            total: 8
        }
    );
    assert_eq!(
        b.progress,
        ProgressSnapshot {
            completed: 12,
            total: 12
        }
    );
    Ok(())
}
