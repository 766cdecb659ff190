// src/exec/pool.rs

//! Bounded set of in-flight units of work shared by both backends.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error};

use crate::engine::{FailureKind, MapFailure, Outcome};
use crate::errors::{Result, SimpleMrError};

use super::backend::{Completion, TaskHandle};

/// In-flight units of work, at most `parallelism` of them running at once.
///
/// Each unit is spawned on the Tokio runtime immediately but waits for a
/// permit from a fair semaphore before doing any work, so excess submissions
/// queue in submission order until a worker frees up.
#[derive(Debug)]
pub struct WorkerPool<O> {
    parallelism: usize,
    permits: Arc<Semaphore>,
    units: JoinSet<(TaskHandle, Outcome<O>)>,
    /// Tokio task id -> handle, so a unit that dies is still reported.
    handles: HashMap<Id, TaskHandle>,
    next_handle: u64,
}

impl<O: Send + 'static> WorkerPool<O> {
    pub fn new(parallelism: usize) -> Result<Self> {
        if parallelism == 0 {
            return Err(SimpleMrError::InvalidParallelism(parallelism));
        }

        Ok(Self {
            parallelism,
            permits: Arc::new(Semaphore::new(parallelism)),
            units: JoinSet::new(),
            handles: HashMap::new(),
            next_handle: 0,
        })
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub fn outstanding(&self) -> usize {
        self.units.len()
    }

    /// Spawn one unit of work. It runs once a permit is available.
    pub fn spawn<F>(&mut self, unit: F) -> TaskHandle
    where
        F: Future<Output = Outcome<O>> + Send + 'static,
    {
        let handle = TaskHandle::new(self.next_handle);
        self.next_handle += 1;

        let permits = Arc::clone(&self.permits);
        let abort = self.units.spawn(async move {
            let outcome = match permits.acquire_owned().await {
                Ok(permit) => {
                    let outcome = unit.await;
                    drop(permit);
                    outcome
                }
                Err(_) => Outcome::Failure(MapFailure::new(
                    FailureKind::Panic,
                    "worker pool shut down before the unit of work started",
                )),
            };
            (handle, outcome)
        });

        self.handles.insert(abort.id(), handle);
        handle
    }

    /// Wait for the next unit of work to resolve, in completion order.
    pub async fn next_completed(&mut self) -> Option<Completion<O>> {
        loop {
            match self.units.join_next_with_id().await? {
                Ok((id, (handle, outcome))) => {
                    self.handles.remove(&id);
                    return Some(Completion { handle, outcome });
                }
                Err(err) => {
                    let Some(handle) = self.handles.remove(&err.id()) else {
                        error!(task_id = %err.id(), "joined a unit of work with no recorded handle");
                        continue;
                    };
                    debug!(task = %handle, "unit of work died before reporting");
                    return Some(Completion {
                        handle,
                        outcome: Outcome::Failure(failure_from_join_error(err)),
                    });
                }
            }
        }
    }

    /// Stop accepting work and abort everything still outstanding.
    pub async fn shutdown(&mut self) {
        self.permits.close();
        if !self.units.is_empty() {
            debug!(outstanding = self.units.len(), "aborting outstanding units of work");
        }
        self.units.shutdown().await;
        self.handles.clear();
    }
}

/// Turn a dead task into a failure description.
pub(crate) fn failure_from_join_error(err: JoinError) -> MapFailure {
    if err.is_panic() {
        MapFailure::new(FailureKind::Panic, panic_message(err.into_panic()))
    } else {
        MapFailure::new(FailureKind::Panic, "unit of work was cancelled")
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
