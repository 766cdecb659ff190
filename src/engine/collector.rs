// src/engine/collector.rs

//! Collect mapped values into a map keyed by item.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::errors::Result;
use crate::exec::{BackendKind, ExecutionBackend};
use crate::progress::ProgressTracker;

use super::job::{Engine, JobSummary};
use super::{Mapper, Outcome, Payload};

type StoreFn<I, O> = fn(&mut HashMap<I, O>, I, Outcome<O>) -> anyhow::Result<()>;

/// Keep successful values; failed items leave no entry.
fn store_success<I: Eq + Hash, O>(
    results: &mut HashMap<I, O>,
    item: I,
    outcome: Outcome<O>,
) -> anyhow::Result<()> {
    if let Outcome::Success(value) = outcome {
        results.insert(item, value);
    }
    Ok(())
}

/// An [`Engine`] whose accumulator is `item -> mapped value`.
pub struct Collector<I, O> {
    engine: Engine<I, O, HashMap<I, O>, StoreFn<I, O>>,
}

impl<I, O> fmt::Debug for Collector<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("engine", &self.engine)
            .finish()
    }
}

impl<I, O> Collector<I, O>
where
    I: Payload + Clone + fmt::Debug + Eq + Hash,
    O: Payload,
{
    pub fn new<M>(
        datasource: impl IntoIterator<Item = I>,
        mapper: M,
        parallelism: usize,
        backend: BackendKind,
    ) -> Result<Self>
    where
        M: Mapper<Item = I, Output = O>,
    {
        let engine = Engine::new(
            datasource,
            HashMap::new(),
            mapper,
            store_success::<I, O> as StoreFn<I, O>,
            parallelism,
            backend,
        )?;

        Ok(Self {
            engine: engine.with_label("collect"),
        })
    }

    pub fn with_backend(
        datasource: impl IntoIterator<Item = I>,
        backend: Box<dyn ExecutionBackend<I, O>>,
    ) -> Self {
        let engine = Engine::with_backend(
            datasource,
            HashMap::new(),
            store_success::<I, O> as StoreFn<I, O>,
            backend,
        );

        Self {
            engine: engine.with_label("collect"),
        }
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        Self {
            engine: self.engine.with_label(label),
        }
    }

    pub fn with_progress(self, progress: Arc<ProgressTracker>) -> Self {
        Self {
            engine: self.engine.with_progress(progress),
        }
    }

    /// Map every item and return the successful `item -> value` pairs.
    pub async fn collect(self) -> Result<HashMap<I, O>> {
        self.engine.run().await
    }

    pub async fn collect_with_summary(self) -> Result<JobSummary<HashMap<I, O>>> {
        self.engine.run_with_summary().await
    }
}
