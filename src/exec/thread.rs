// src/exec/thread.rs

//! Thread-based execution backend.

use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::{Mapper, Outcome};
use crate::errors::Result;

use super::backend::{BoxFuture, Completion, ExecutionBackend, TaskHandle};
use super::pool::{WorkerPool, failure_from_join_error};

/// Runs the mapper on Tokio's blocking thread pool, in this process.
///
/// The mapper is shared between threads behind an `Arc`; items are moved into
/// the thread that maps them. A panic inside the mapper is caught by the
/// blocking task and reported as a [`FailureKind::Panic`] outcome.
///
/// [`FailureKind::Panic`]: crate::engine::FailureKind::Panic
pub struct ThreadBackend<M: Mapper> {
    mapper: Arc<M>,
    pool: WorkerPool<M::Output>,
}

impl<M> ThreadBackend<M>
where
    M: Mapper,
    M::Item: Send + 'static,
    M::Output: Send + 'static,
{
    pub fn new(mapper: M, parallelism: usize) -> Result<Self> {
        let pool = WorkerPool::new(parallelism)?;
        info!(parallelism, "thread backend ready");

        Ok(Self {
            mapper: Arc::new(mapper),
            pool,
        })
    }
}

impl<M> ExecutionBackend<M::Item, M::Output> for ThreadBackend<M>
where
    M: Mapper,
    M::Item: Send + 'static,
    M::Output: Send + 'static,
{
    fn parallelism(&self) -> usize {
        self.pool.parallelism()
    }

    fn outstanding(&self) -> usize {
        self.pool.outstanding()
    }

    fn submit(&mut self, item: M::Item) -> TaskHandle {
        let mapper = Arc::clone(&self.mapper);

        self.pool.spawn(async move {
            match tokio::task::spawn_blocking(move || mapper.map(&item)).await {
                Ok(result) => Outcome::from(result),
                Err(err) => Outcome::Failure(failure_from_join_error(err)),
            }
        })
    }

    fn next_completed(&mut self) -> BoxFuture<'_, Option<Completion<M::Output>>> {
        Box::pin(self.pool.next_completed())
    }

    fn shutdown(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.pool.shutdown().await;
            debug!("thread backend shut down");
            Ok(())
        })
    }
}
