//! An [`ExecutionBackend`] that runs nothing concurrently.
//!
//! Submitted items are queued; every `next_completed` call maps one queued
//! item with the script and reports it. The order in which units complete is
//! chosen by the test, which makes completion-order handling deterministic.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use simplemr::engine::{FailureKind, MapFailure, Outcome};
use simplemr::errors::Result;
use simplemr::exec::{BoxFuture, Completion, ExecutionBackend, TaskHandle};

type Script<I, O> = Box<dyn Fn(&I) -> Outcome<O> + Send>;

/// Which queued unit of work completes next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOrder {
    /// First submitted, first completed.
    Submission,
    /// Last submitted, first completed.
    Reverse,
}

pub struct ScriptedBackend<I, O> {
    script: Script<I, O>,
    order: CompletionOrder,
    queued: VecDeque<(TaskHandle, I)>,
    next_handle: u64,
    bogus_completion: bool,
    shutdown_calls: Arc<Mutex<usize>>,
    completed: Arc<Mutex<Vec<TaskHandle>>>,
}

impl<I, O> ScriptedBackend<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    pub fn new<F>(order: CompletionOrder, script: F) -> Self
    where
        F: Fn(&I) -> Outcome<O> + Send + 'static,
    {
        Self {
            script: Box::new(script),
            order,
            queued: VecDeque::new(),
            next_handle: 0,
            bogus_completion: false,
            shutdown_calls: Arc::new(Mutex::new(0)),
            completed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Report one completion for a handle that was never submitted, before
    /// any real completion.
    pub fn with_bogus_completion(mut self) -> Self {
        self.bogus_completion = true;
        self
    }

    /// Handles in the order they were reported.
    pub fn completed_log(&self) -> Arc<Mutex<Vec<TaskHandle>>> {
        Arc::clone(&self.completed)
    }

    /// How many times `shutdown` was called.
    pub fn shutdown_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.shutdown_calls)
    }

    pub fn boxed(self) -> Box<dyn ExecutionBackend<I, O>> {
        Box::new(self)
    }
}

impl<I, O> ExecutionBackend<I, O> for ScriptedBackend<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn parallelism(&self) -> usize {
        1
    }

    fn outstanding(&self) -> usize {
        self.queued.len()
    }

    fn submit(&mut self, item: I) -> TaskHandle {
        let handle = TaskHandle::new(self.next_handle);
        self.next_handle += 1;
        self.queued.push_back((handle, item));
        handle
    }

    fn next_completed(&mut self) -> BoxFuture<'_, Option<Completion<O>>> {
        Box::pin(async move {
            if self.bogus_completion {
                self.bogus_completion = false;
                return Some(Completion {
                    handle: TaskHandle::new(u64::MAX),
                    outcome: Outcome::Failure(MapFailure::new(FailureKind::Error, "bogus")),
                });
            }

            let (handle, item) = match self.order {
                CompletionOrder::Submission => self.queued.pop_front()?,
                CompletionOrder::Reverse => self.queued.pop_back()?,
            };

            let outcome = (self.script)(&item);
            self.completed.lock().unwrap().push(handle);
            Some(Completion { handle, outcome })
        })
    }

    fn shutdown(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.queued.clear();
            *self.shutdown_calls.lock().unwrap() += 1;
            Ok(())
        })
    }
}
