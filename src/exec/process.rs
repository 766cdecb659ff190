// src/exec/process.rs

//! Process-based execution backend.
//!
//! Every unit of work runs in its own worker process: the backend spawns the
//! configured [`WorkerCommand`], writes one [`WorkerRequest`] to its stdin and
//! reads one [`WorkerReply`] from its stdout. Whatever the worker does (error
//! reply, crash, garbage on stdout) ends up as an [`Outcome`] for that item;
//! it never fails the dispatcher.

use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::engine::{FailureKind, MapFailure, Mapper, Outcome, PortableMapper};
use crate::errors::{Result, SimpleMrError};

use super::backend::{BoxFuture, Completion, ExecutionBackend, TaskHandle};
use super::pool::WorkerPool;
use super::protocol::{WorkerReply, WorkerRequest};

/// Subcommand the `simplemr` binary serves worker requests under.
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Program and arguments spawned for each unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<S: Into<String>>(mut self, args: impl IntoIterator<Item = S>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// `<current executable> worker`.
    pub fn current_exe() -> Result<Self> {
        let program = std::env::current_exe().map_err(|e| {
            SimpleMrError::WorkerUnavailable(format!("cannot locate current executable: {e}"))
        })?;
        Ok(Self::new(program).arg(WORKER_SUBCOMMAND))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Fail fast on a worker program that cannot be spawned.
    ///
    /// A program given as a path must exist; a bare program name must be
    /// found in one of the `PATH` directories.
    pub fn check_available(&self) -> Result<()> {
        let is_path = self.program.components().count() > 1;
        if is_path {
            if !self.program.exists() {
                return Err(SimpleMrError::WorkerUnavailable(format!(
                    "worker program {:?} does not exist",
                    self.program
                )));
            }
            return Ok(());
        }

        match find_in_path(&self.program) {
            Some(found) => {
                debug!(
                    program = ?self.program,
                    resolved = %found.display(),
                    "worker program found on PATH"
                );
                Ok(())
            }
            None => Err(SimpleMrError::WorkerUnavailable(format!(
                "worker program {:?} was not found on PATH",
                self.program
            ))),
        }
    }
}

/// First file named `program` in the `PATH` directories.
fn find_in_path(program: &Path) -> Option<PathBuf> {
    let dirs = std::env::var_os("PATH")?;
    std::env::split_paths(&dirs)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Maps every item in a separate worker process.
///
/// The mapper itself never runs here; only its [`PortableMapper`]
/// description travels to the workers.
pub struct ProcessBackend<M: Mapper> {
    portable: PortableMapper,
    worker: Arc<WorkerCommand>,
    pool: WorkerPool<M::Output>,
    _mapper: PhantomData<fn() -> M>,
}

impl<M> ProcessBackend<M>
where
    M: Mapper,
    M::Item: Serialize,
    M::Output: DeserializeOwned + Send + 'static,
{
    /// Build a backend for `mapper`, rejecting mappers that cannot be
    /// rebuilt inside a worker and worker programs that are missing.
    pub fn new(mapper: M, parallelism: usize, worker: WorkerCommand) -> Result<Self> {
        let pool = WorkerPool::new(parallelism)?;

        let portable = mapper.portable().ok_or_else(|| {
            SimpleMrError::NotPortable(format!(
                "{} has no portable description; use the thread backend or implement \
                 `Mapper::portable` and register it with the worker",
                std::any::type_name::<M>()
            ))
        })?;

        worker.check_available()?;

        info!(
            parallelism,
            mapper = %portable.name(),
            program = %worker.program().display(),
            "process backend ready"
        );

        Ok(Self {
            portable,
            worker: Arc::new(worker),
            pool,
            _mapper: PhantomData,
        })
    }

    pub fn worker(&self) -> &WorkerCommand {
        &self.worker
    }
}

impl<M> ExecutionBackend<M::Item, M::Output> for ProcessBackend<M>
where
    M: Mapper,
    M::Item: Serialize,
    M::Output: DeserializeOwned + Send + 'static,
{
    fn parallelism(&self) -> usize {
        self.pool.parallelism()
    }

    fn outstanding(&self) -> usize {
        self.pool.outstanding()
    }

    fn submit(&mut self, item: M::Item) -> TaskHandle {
        // Encode here so the unit future does not need to own the item.
        let request = WorkerRequest::new(&self.portable, &item).and_then(|r| r.to_bytes());
        let worker = Arc::clone(&self.worker);

        self.pool.spawn(async move {
            match request {
                Ok(request) => run_worker(&worker, request).await,
                Err(err) => Outcome::Failure(MapFailure::new(
                    FailureKind::Protocol,
                    format!("cannot encode item for worker: {err}"),
                )),
            }
        })
    }

    fn next_completed(&mut self) -> BoxFuture<'_, Option<Completion<M::Output>>> {
        Box::pin(self.pool.next_completed())
    }

    fn shutdown(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            // Aborted units drop their `Child`, and `kill_on_drop` kills it.
            self.pool.shutdown().await;
            debug!("process backend shut down");
            Ok(())
        })
    }
}

/// Run one worker process to completion.
///
/// Spawn and IO errors are converted into a worker failure and logged.
async fn run_worker<O: DeserializeOwned>(worker: &WorkerCommand, request: Vec<u8>) -> Outcome<O> {
    match run_worker_inner(worker, request).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(
                program = %worker.program().display(),
                error = %format!("{err:#}"),
                "worker execution error"
            );
            Outcome::Failure(MapFailure::new(
                FailureKind::WorkerExit { code: None },
                format!("{err:#}"),
            ))
        }
    }
}

async fn run_worker_inner<O: DeserializeOwned>(
    worker: &WorkerCommand,
    request: Vec<u8>,
) -> anyhow::Result<Outcome<O>> {
    let mut cmd = Command::new(worker.program());
    cmd.args(worker.arguments())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning worker process {:?}", worker.program()))?;

    let pid = child.id();
    debug!(pid = ?pid, program = %worker.program().display(), "worker process started");

    // Feed stdin while collecting output, so a worker that writes before it
    // has read the whole request cannot fill a pipe and stall.
    let stdin = child.stdin.take();
    let feed = async move {
        // Dropping stdin at the end closes the pipe so the worker sees EOF.
        let Some(mut stdin) = stdin else {
            return Ok(());
        };
        match stdin.write_all(&request).await {
            Ok(()) => Ok(()),
            // The worker exited without reading; its exit status tells the story.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!(pid = ?pid, "worker closed stdin before reading the request");
                Ok(())
            }
            Err(e) => Err(e),
        }
    };

    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    fed.context("writing request to worker stdin")?;
    let output = output.context("waiting for worker process")?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    for line in stderr.lines() {
        debug!(pid = ?pid, "worker stderr: {}", line);
    }

    if !output.status.success() {
        let code = output.status.code();
        let detail = failure_detail(&stderr);

        debug!(pid = ?pid, exit_code = ?code, "worker process exited unsuccessfully");
        return Ok(Outcome::Failure(MapFailure::new(
            FailureKind::WorkerExit { code },
            detail,
        )));
    }

    Ok(WorkerReply::decode(&output.stdout))
}

/// The most useful stderr line of a failed worker.
///
/// A Rust panic ends with the hook's backtrace note, so the `panicked at`
/// line and the message after it are preferred; otherwise the last non-empty
/// line is used.
fn failure_detail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if let Some(at) = lines.iter().rposition(|line| line.contains("panicked at")) {
        return match lines.get(at + 1) {
            Some(message) if !message.starts_with("note: run with `RUST_BACKTRACE") => {
                format!("{} {}", lines[at], message)
            }
            _ => lines[at].to_string(),
        };
    }

    lines
        .iter()
        .rev()
        .find(|line| !line.starts_with("note: run with `RUST_BACKTRACE"))
        .map(|line| line.to_string())
        .unwrap_or_else(|| "worker produced no stderr output".to_string())
}
