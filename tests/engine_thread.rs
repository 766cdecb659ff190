// tests/engine_thread.rs

mod common;
use crate::common::builders::{numbered_items, sentences};
use crate::common::{init_tracing, with_timeout};

use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::bail;

use simplemr::demo::{WordCounts, WordFrequency, sum_word_counts};
use simplemr::engine::{Collector, Engine, FailureKind, MapFailure, Outcome, map_fn};
use simplemr::errors::SimpleMrError;
use simplemr::exec::BackendKind;
use simplemr::progress::ProgressTracker;

type TestResult = Result<(), Box<dyn Error>>;

fn hidden_progress() -> Arc<ProgressTracker> {
    Arc::new(ProgressTracker::hidden())
}

#[tokio::test]
async fn collector_maps_every_item_to_its_length() -> TestResult {
    init_tracing();

    let items = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];
    let lengths = map_fn(|s: &String| Ok(s.len()));

    let result = with_timeout(
        Collector::new(items, lengths, 2, BackendKind::Thread)?
            .with_progress(hidden_progress())
            .collect(),
    )
    .await?;

    let expected: HashMap<String, usize> = [("a", 1), ("bb", 2), ("ccc", 3)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    assert_eq!(result, expected);
    Ok(())
}

#[tokio::test]
async fn word_frequency_sums_counts_across_sentences() -> TestResult {
    init_tracing();

    let items = vec!["x y".to_string(), "x y y".to_string()];

    let counts = with_timeout(
        Engine::new(
            items,
            WordCounts::new(),
            WordFrequency,
            sum_word_counts,
            4,
            BackendKind::Thread,
        )?
        .with_progress(hidden_progress())
        .run(),
    )
    .await?;

    assert_eq!(counts.len(), 2);
    assert_eq!(counts["x"], 2);
    assert_eq!(counts["y"], 3);
    Ok(())
}

#[tokio::test]
async fn faulting_item_is_reported_and_never_stored() -> TestResult {
    init_tracing();

    let items = numbered_items(5);
    let mapper = map_fn(|s: &String| {
        if s == "item-2" {
            bail!("refusing {s}");
        }
        Ok(s.len())
    });

    let mut failures: Vec<(String, MapFailure)> = Vec::new();
    let summary = with_timeout(
        Engine::new(
            items,
            HashMap::new(),
            mapper,
            |acc: &mut HashMap<String, usize>, item: String, outcome: Outcome<usize>| {
                match outcome {
                    Outcome::Success(len) => {
                        acc.insert(item, len);
                    }
                    Outcome::Failure(failure) => failures.push((item, failure)),
                }
                Ok(())
            },
            3,
            BackendKind::Thread,
        )?
        .with_progress(hidden_progress())
        .run_with_summary(),
    )
    .await?;

    assert_eq!(summary.accumulator.len(), 4);
    assert!(!summary.accumulator.contains_key("item-2"));
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.progress.completed, 5);
    assert!(summary.progress.is_complete());

    assert_eq!(failures.len(), 1);
    let (item, failure) = &failures[0];
    assert_eq!(item, "item-2");
    assert_eq!(failure.kind(), FailureKind::Error);
    assert!(failure.message().contains("refusing item-2"));
    Ok(())
}

#[tokio::test]
async fn job_completes_when_every_item_fails() -> TestResult {
    init_tracing();

    let items = numbered_items(6);
    let mapper = map_fn(|_: &String| -> anyhow::Result<usize> { bail!("always") });

    let summary = with_timeout(
        Engine::new(
            items.clone(),
            Vec::new(),
            mapper,
            |acc: &mut Vec<String>, item: String, outcome: Outcome<usize>| {
                assert!(!outcome.is_success());
                acc.push(item);
                Ok(())
            },
            2,
            BackendKind::Thread,
        )?
        .with_progress(hidden_progress())
        .run_with_summary(),
    )
    .await?;

    let mut seen = summary.accumulator;
    seen.sort();
    let mut expected = items;
    expected.sort();
    assert_eq!(seen, expected);
    assert_eq!(summary.failed, 6);
    assert_eq!(summary.progress.completed, 6);
    Ok(())
}

#[tokio::test]
async fn panicking_mapper_is_captured_as_panic_failure() -> TestResult {
    init_tracing();

    let items = vec!["ok".to_string(), "boom".to_string()];
    let mapper = map_fn(|s: &String| {
        if s == "boom" {
            panic!("mapper blew up");
        }
        Ok(s.len())
    });

    let mut kinds = Vec::new();
    let result = with_timeout(
        Engine::new(
            items,
            HashMap::new(),
            mapper,
            |acc: &mut HashMap<String, usize>, item: String, outcome: Outcome<usize>| {
                match outcome {
                    Outcome::Success(len) => {
                        acc.insert(item, len);
                    }
                    Outcome::Failure(failure) => {
                        kinds.push((item, failure.kind(), failure.message().to_string()))
                    }
                }
                Ok(())
            },
            2,
            BackendKind::Thread,
        )?
        .with_progress(hidden_progress())
        .run(),
    )
    .await?;

    assert_eq!(result.len(), 1);
    assert_eq!(result["ok"], 2);
    assert_eq!(kinds.len(), 1);
    assert_eq!(kinds[0].0, "boom");
    assert_eq!(kinds[0].1, FailureKind::Panic);
    assert!(kinds[0].2.contains("mapper blew up"));
    Ok(())
}

#[tokio::test]
async fn reducer_error_aborts_job() -> TestResult {
    init_tracing();

    let items = numbered_items(4);
    let mapper = map_fn(|s: &String| Ok(s.len()));

    let result = with_timeout(
        Engine::new(
            items,
            0usize,
            mapper,
            |acc: &mut usize, item: String, _outcome: Outcome<usize>| {
                *acc += 1;
                if *acc == 2 {
                    bail!("accumulator full at {item}");
                }
                Ok(())
            },
            2,
            BackendKind::Thread,
        )?
        .with_progress(hidden_progress())
        .run(),
    )
    .await;

    match result {
        Err(SimpleMrError::ReduceFailed { item, source }) => {
            assert!(item.contains("item-"));
            assert!(source.to_string().contains("accumulator full"));
        }
        Err(e) => panic!("Expected ReduceFailed, got: {:?}", e),
        Ok(v) => panic!("Expected error, got Ok({v})"),
    }
    Ok(())
}

#[tokio::test]
#[should_panic(expected = "reducer exploded on item-")]
async fn reducer_panic_propagates_out_of_run() {
    init_tracing();

    let mapper = map_fn(|s: &String| Ok(s.len()));
    let job = Engine::new(
        numbered_items(3),
        0usize,
        mapper,
        |_: &mut usize, item: String, _outcome: Outcome<usize>| -> anyhow::Result<()> {
            panic!("reducer exploded on {item}");
        },
        2,
        BackendKind::Thread,
    )
    .expect("valid job")
    .with_progress(hidden_progress());

    let _ = with_timeout(job.run()).await;
}

#[test]
fn zero_parallelism_is_rejected() {
    let mapper = map_fn(|s: &String| Ok(s.len()));
    let result = Collector::new(numbered_items(3), mapper, 0, BackendKind::Thread);

    match result {
        Err(SimpleMrError::InvalidParallelism(0)) => {}
        Err(e) => panic!("Expected InvalidParallelism, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[tokio::test]
async fn empty_datasource_returns_initial_accumulator() -> TestResult {
    init_tracing();

    let summary = with_timeout(
        Engine::new(
            Vec::<String>::new(),
            WordCounts::from([("seed".to_string(), 7)]),
            WordFrequency,
            sum_word_counts,
            3,
            BackendKind::Thread,
        )?
        .with_progress(hidden_progress())
        .run_with_summary(),
    )
    .await?;

    assert_eq!(summary.accumulator.len(), 1);
    assert_eq!(summary.accumulator["seed"], 7);
    assert_eq!(summary.progress.total, 0);
    assert_eq!(summary.progress.completed, 0);
    Ok(())
}

#[tokio::test]
async fn running_the_same_job_twice_gives_the_same_result() -> TestResult {
    init_tracing();

    let items = sentences(40);

    let mut results = Vec::new();
    for _ in 0..2 {
        let counts = with_timeout(
            Engine::new(
                items.clone(),
                WordCounts::new(),
                WordFrequency,
                sum_word_counts,
                4,
                BackendKind::Thread,
            )?
            .with_progress(hidden_progress())
            .run(),
        )
        .await?;
        results.push(counts);
    }

    assert_eq!(results[0], results[1]);
    Ok(())
}

#[tokio::test]
async fn datasource_is_snapshotted_at_construction() -> TestResult {
    init_tracing();

    let mut items = vec!["a".to_string(), "bb".to_string()];
    let job = Collector::new(
        items.clone(),
        map_fn(|s: &String| Ok(s.len())),
        1,
        BackendKind::Thread,
    )?
    .with_progress(hidden_progress());

    items.push("ccc".to_string());

    let result = with_timeout(job.collect()).await?;
    assert_eq!(result.len(), 2);
    assert!(!result.contains_key("ccc"));
    Ok(())
}

#[tokio::test]
async fn no_more_than_parallelism_units_run_at_once() -> TestResult {
    init_tracing();

    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mapper = {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        map_fn(move |s: &String| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            running.fetch_sub(1, Ordering::SeqCst);
            Ok(s.len())
        })
    };

    let result = with_timeout(
        Collector::new(numbered_items(12), mapper, 3, BackendKind::Thread)?
            .with_progress(hidden_progress())
            .collect(),
    )
    .await?;

    assert_eq!(result.len(), 12);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(peak.load(Ordering::SeqCst) >= 1);
    Ok(())
}
