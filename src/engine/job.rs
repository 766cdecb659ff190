// src/engine/job.rs

//! The map/reduce job and its draining loop.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::errors::{Result, SimpleMrError};
use crate::exec::{BackendKind, Completion, ExecutionBackend, TaskHandle, build_backend};
use crate::progress::{ProgressSnapshot, ProgressTracker};

use super::{Mapper, Outcome, Payload};

const DEFAULT_LABEL: &str = "mapreduce";

/// What a finished job hands back besides the accumulator.
#[derive(Debug, Clone)]
pub struct JobSummary<A> {
    pub accumulator: A,
    /// Final progress counters; `completed == total` for every finished job.
    pub progress: ProgressSnapshot,
    /// Number of items whose mapping failed.
    pub failed: usize,
    pub elapsed: Duration,
}

/// One map/reduce job.
///
/// The engine owns a snapshot of the datasource and the accumulator. On
/// [`run`](Engine::run) it submits one unit of work per item to its execution
/// backend, then drains completions in the order they arrive. Every
/// completion is handed to the reducer together with the item it came from;
/// reductions happen one at a time on the task that awaits `run`, so the
/// reducer has exclusive access to the accumulator without any locking.
///
/// A failing mapping call never aborts the job: the reducer receives an
/// [`Outcome::Failure`] for that item and decides what to do with it. A
/// failing *reducer* is fatal and aborts the job.
pub struct Engine<I, O, A, R> {
    label: String,
    datasource: Vec<I>,
    accumulator: A,
    reducer: R,
    backend: Box<dyn ExecutionBackend<I, O>>,
    progress: Arc<ProgressTracker>,
}

impl<I, O, A, R> fmt::Debug for Engine<I, O, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("label", &self.label)
            .field("items", &self.datasource.len())
            .field("parallelism", &self.backend.parallelism())
            .finish_non_exhaustive()
    }
}

impl<I, O, A, R> Engine<I, O, A, R>
where
    I: Payload + Clone + fmt::Debug,
    O: Payload,
    R: FnMut(&mut A, I, Outcome<O>) -> anyhow::Result<()> + Send,
{
    /// Set up a job.
    ///
    /// The datasource is copied into the job here, so later changes to the
    /// caller's collection do not affect it. Fails if `parallelism` is 0 or
    /// the backend cannot be built for `mapper` (see [`build_backend`]).
    pub fn new<M>(
        datasource: impl IntoIterator<Item = I>,
        accumulator: A,
        mapper: M,
        reducer: R,
        parallelism: usize,
        backend: BackendKind,
    ) -> Result<Self>
    where
        M: Mapper<Item = I, Output = O>,
    {
        let backend = build_backend(backend, mapper, parallelism)?;
        Ok(Self::with_backend(datasource, accumulator, reducer, backend))
    }

    /// Set up a job on an already constructed backend.
    pub fn with_backend(
        datasource: impl IntoIterator<Item = I>,
        accumulator: A,
        reducer: R,
        backend: Box<dyn ExecutionBackend<I, O>>,
    ) -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            datasource: datasource.into_iter().collect(),
            accumulator,
            reducer,
            backend,
            progress: Arc::new(ProgressTracker::default()),
        }
    }

    /// Name shown on the progress bar and in logs.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Report progress through a shared tracker.
    pub fn with_progress(mut self, progress: Arc<ProgressTracker>) -> Self {
        self.progress = progress;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn datasource(&self) -> &[I] {
        &self.datasource
    }

    /// Run the job and return the final accumulator.
    pub async fn run(self) -> Result<A> {
        Ok(self.run_with_summary().await?.accumulator)
    }

    /// Run the job and return the accumulator with its final counters.
    pub async fn run_with_summary(self) -> Result<JobSummary<A>> {
        let Engine {
            label,
            datasource,
            mut accumulator,
            mut reducer,
            mut backend,
            progress,
        } = self;

        let started = Instant::now();
        let mut tracked = progress.register(&label, datasource.len() as u64);
        let job = tracked.id();

        info!(
            %job,
            label = %label,
            items = datasource.len(),
            parallelism = backend.parallelism(),
            "starting map/reduce job"
        );

        let mut pending: HashMap<TaskHandle, I> = HashMap::with_capacity(datasource.len());
        for item in datasource {
            let task = backend.submit(item.clone());
            pending.insert(task, item);
        }
        debug!(%job, submitted = pending.len(), "all units of work submitted");

        let mut failed = 0usize;

        while let Some(Completion { handle: task, outcome }) = backend.next_completed().await {
            let Some(item) = pending.remove(&task) else {
                abort(&mut backend).await;
                return Err(SimpleMrError::LostTask(format!(
                    "{task} completed but was never submitted"
                )));
            };

            if let Outcome::Failure(failure) = &outcome {
                failed += 1;
                warn!(
                    %job,
                    %task,
                    item = ?item,
                    kind = %failure.kind(),
                    error = %failure.message(),
                    "mapping failed"
                );
            }

            let described = format!("{item:?}");
            if let Err(source) = reducer(&mut accumulator, item, outcome) {
                error!(
                    %job,
                    %task,
                    item = %described,
                    error = %format!("{source:#}"),
                    "reduction failed; aborting job"
                );
                abort(&mut backend).await;
                return Err(SimpleMrError::ReduceFailed {
                    item: described,
                    source,
                });
            }

            progress.advance(&mut tracked, 1);
        }

        if !pending.is_empty() {
            abort(&mut backend).await;
            return Err(SimpleMrError::LostTask(format!(
                "{} unit(s) of work were never reported back",
                pending.len()
            )));
        }

        backend.shutdown().await?;
        let snapshot = tracked.finish();
        let elapsed = started.elapsed();

        info!(
            %job,
            label = %label,
            completed = snapshot.completed,
            failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "map/reduce job finished"
        );

        Ok(JobSummary {
            accumulator,
            progress: snapshot,
            failed,
            elapsed,
        })
    }
}

/// Shut the backend down after a fatal error, keeping the original error.
async fn abort<I, O>(backend: &mut Box<dyn ExecutionBackend<I, O>>) {
    if let Err(err) = backend.shutdown().await {
        warn!(error = %err, "backend shutdown failed while aborting job");
    }
}
