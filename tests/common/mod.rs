#![allow(dead_code)]

pub use simplemr_test_utils::builders;
pub use simplemr_test_utils::{init_tracing, with_timeout};

use simplemr::exec::{BackendKind, WORKER_SUBCOMMAND, WorkerCommand};

/// The `simplemr` binary built for this test run, serving worker requests.
pub fn worker_command() -> WorkerCommand {
    WorkerCommand::new(env!("CARGO_BIN_EXE_simplemr")).arg(WORKER_SUBCOMMAND)
}

/// Process backend whose workers are the built `simplemr` binary.
pub fn process_backend() -> BackendKind {
    BackendKind::Process(worker_command())
}

/// Process backend that runs a shell snippet instead of a real worker.
pub fn shell_backend(script: &str) -> BackendKind {
    BackendKind::Process(WorkerCommand::new("sh").args(["-c", script]))
}
