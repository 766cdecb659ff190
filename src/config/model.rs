// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{BackendType, ProgressDisplay};

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [job]
/// parallelism = 4
/// backend = "process"
/// progress = "stderr"
///
/// [worker]
/// program = "/usr/local/bin/simplemr"
/// args = ["worker"]
/// ```
///
/// All sections are optional. The backend has no default: it must come from
/// `[job].backend` or from the command line.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Job settings from `[job]`.
    #[serde(default)]
    pub job: JobSection,

    /// Worker process command from `[worker]` (process backend only).
    #[serde(default)]
    pub worker: Option<WorkerSection>,
}

/// Validated configuration. Build one with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub job: JobSection,
    pub worker: Option<WorkerSection>,
}

impl ConfigFile {
    /// Wrap sections that have already been validated.
    pub(crate) fn new_unchecked(job: JobSection, worker: Option<WorkerSection>) -> Self {
        Self { job, worker }
    }
}

/// `[job]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSection {
    /// Number of units of work that may run at the same time.
    ///
    /// Defaults to the number of available CPUs.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// `"thread"` or `"process"`.
    #[serde(default)]
    pub backend: Option<BackendType>,

    /// `"stderr"` (default) or `"hidden"`.
    #[serde(default)]
    pub progress: ProgressDisplay,
}

pub(crate) fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for JobSection {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            backend: None,
            progress: ProgressDisplay::default(),
        }
    }
}

/// `[worker]` section.
///
/// If absent, process backends spawn `<current executable> worker`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerSection {
    /// Program to spawn for every unit of work.
    pub program: PathBuf,

    /// Arguments passed to `program`.
    #[serde(default)]
    pub args: Vec<String>,
}
