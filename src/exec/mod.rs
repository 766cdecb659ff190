// src/exec/mod.rs

//! Execution layer.
//!
//! This module is responsible for actually running units of work (one call
//! of the mapper on one item) with bounded parallelism, and for reporting
//! their outcomes back to the engine in completion order.
//!
//! - [`backend`] provides the `ExecutionBackend` trait, `BackendKind` and
//!   the `build_backend` constructor the engine uses.
//! - [`pool`] holds the bounded set of in-flight units shared by both
//!   backends.
//! - [`thread`] maps items on OS threads inside this process.
//! - [`process`] maps items in spawned worker processes.
//! - [`protocol`] is the JSON wire format spoken with worker processes.

pub mod backend;
pub mod pool;
pub mod process;
pub mod protocol;
pub mod thread;

pub use backend::{
    BackendKind, BoxFuture, Completion, ExecutionBackend, TaskHandle, build_backend,
};
pub use pool::WorkerPool;
pub use process::{ProcessBackend, WORKER_SUBCOMMAND, WorkerCommand};
pub use protocol::{WorkerReply, WorkerRequest};
pub use thread::ThreadBackend;
