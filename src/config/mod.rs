// src/config/mod.rs

//! Configuration loading and validation for simplemr.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate basic invariants (`validate.rs`).
//! - Merge command-line overrides into the settings a job runs with
//!   ([`JobSettings`]).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, JobSection, RawConfigFile, WorkerSection};

use crate::errors::{Result, SimpleMrError};
use crate::exec::{BackendKind, WorkerCommand};
use crate::types::{BackendType, ProgressDisplay};

/// Values given on the command line; each one replaces the config value.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobOverrides {
    pub parallelism: Option<usize>,
    pub backend: Option<BackendType>,
    pub progress: Option<ProgressDisplay>,
}

/// Fully resolved settings for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    pub parallelism: usize,
    pub backend: BackendKind,
    pub progress: ProgressDisplay,
}

impl ConfigFile {
    /// The worker command from `[worker]`, if configured.
    pub fn worker_command(&self) -> Option<WorkerCommand> {
        self.worker
            .as_ref()
            .map(|w| WorkerCommand::new(&w.program).args(w.args.iter().cloned()))
    }

    /// Merge `overrides` into this config.
    ///
    /// Fails if neither the config nor the overrides select a backend.
    pub fn job_settings(&self, overrides: JobOverrides) -> Result<JobSettings> {
        let backend = overrides.backend.or(self.job.backend).ok_or_else(|| {
            SimpleMrError::ConfigError(
                "no backend selected; pass --backend or set [job].backend".to_string(),
            )
        })?;

        let parallelism = overrides.parallelism.unwrap_or(self.job.parallelism);
        if parallelism == 0 {
            return Err(SimpleMrError::InvalidParallelism(parallelism));
        }

        Ok(JobSettings {
            parallelism,
            backend: BackendKind::from_type(backend, self.worker_command())?,
            progress: overrides.progress.unwrap_or(self.job.progress),
        })
    }
}
