// src/exec/backend.rs

//! Pluggable execution backend abstraction.
//!
//! The engine talks to an `ExecutionBackend` instead of a concrete pool. This
//! keeps the draining loop free of any branching on backend kind and makes it
//! easy to swap in a scripted backend in tests.
//!
//! - [`ThreadBackend`](super::ThreadBackend) maps items on OS threads inside
//!   this process.
//! - [`ProcessBackend`](super::ProcessBackend) maps every item in a freshly
//!   spawned worker process.
//! - Tests can provide their own implementation that, for example, completes
//!   units of work in a chosen order.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::engine::{Mapper, Outcome, Payload};
use crate::errors::Result;
use crate::types::BackendType;

use super::process::{ProcessBackend, WorkerCommand};
use super::thread::ThreadBackend;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Identifies one submitted unit of work within a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

impl TaskHandle {
    pub fn new(id: u64) -> Self {
        TaskHandle(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// A resolved unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion<O> {
    pub handle: TaskHandle,
    pub outcome: Outcome<O>,
}

/// Trait abstracting how units of work are executed.
///
/// Contract:
/// - every submitted unit runs exactly once and is never retried;
/// - every submitted unit is reported exactly once by `next_completed`, in
///   completion order, and a fault inside the unit is reported as
///   [`Outcome::Failure`] rather than as an error of the backend;
/// - `next_completed` returns `None` once nothing is outstanding.
pub trait ExecutionBackend<I, O>: Send {
    /// Maximum number of units of work executing at the same time.
    fn parallelism(&self) -> usize;

    /// Units submitted but not yet reported by `next_completed`.
    fn outstanding(&self) -> usize;

    /// Queue `map(item)`; it starts as soon as a worker is free.
    fn submit(&mut self, item: I) -> TaskHandle;

    /// Wait for whichever outstanding unit of work resolves first.
    fn next_completed(&mut self) -> BoxFuture<'_, Option<Completion<O>>>;

    /// Release all workers. Units still outstanding are aborted.
    fn shutdown(&mut self) -> BoxFuture<'_, Result<()>>;
}

/// Backend selection for a job, resolved far enough to build the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    /// OS threads inside this process.
    Thread,
    /// One worker process per unit of work, spawned from this command.
    Process(WorkerCommand),
}

impl BackendKind {
    /// Process backend whose workers are `<current executable> worker`.
    pub fn process() -> Result<Self> {
        Ok(BackendKind::Process(WorkerCommand::current_exe()?))
    }

    /// Resolve a configured backend type, using `worker` (or the default
    /// worker command) for process backends.
    pub fn from_type(backend: BackendType, worker: Option<WorkerCommand>) -> Result<Self> {
        match (backend, worker) {
            (BackendType::Thread, _) => Ok(BackendKind::Thread),
            (BackendType::Process, Some(worker)) => Ok(BackendKind::Process(worker)),
            (BackendType::Process, None) => Self::process(),
        }
    }

    pub fn backend_type(&self) -> BackendType {
        match self {
            BackendKind::Thread => BackendType::Thread,
            BackendKind::Process(_) => BackendType::Process,
        }
    }
}

/// Build the backend for `kind` around `mapper`.
///
/// All construction-time failures (bad parallelism, non-portable mapper,
/// missing worker program) surface here, before any work is submitted.
pub fn build_backend<M>(
    kind: BackendKind,
    mapper: M,
    parallelism: usize,
) -> Result<Box<dyn ExecutionBackend<M::Item, M::Output>>>
where
    M: Mapper,
    M::Item: Payload,
    M::Output: Payload,
{
    debug!(backend = ?kind.backend_type(), parallelism, "building execution backend");

    match kind {
        BackendKind::Thread => Ok(Box::new(ThreadBackend::new(mapper, parallelism)?)),
        BackendKind::Process(worker) => {
            Ok(Box::new(ProcessBackend::new(mapper, parallelism, worker)?))
        }
    }
}
