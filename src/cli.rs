// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::JobOverrides;
use crate::types::{BackendType, ProgressDisplay};

/// Command-line arguments for `simplemr`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "simplemr",
    version,
    about = "Run map/reduce jobs over lines of text on threads or worker processes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `simplemr.toml` in the current working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Maximum number of items mapped at the same time.
    #[arg(long, global = true, value_name = "N")]
    pub parallelism: Option<usize>,

    /// Execution backend (thread or process).
    #[arg(long, global = true, value_name = "KIND")]
    pub backend: Option<BackendType>,

    /// Do not draw progress bars.
    #[arg(long, global = true)]
    pub no_progress: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SIMPLEMR_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

impl CliArgs {
    /// Job settings given on the command line.
    pub fn overrides(&self) -> JobOverrides {
        JobOverrides {
            parallelism: self.parallelism,
            backend: self.backend,
            progress: self.no_progress.then_some(ProgressDisplay::Hidden),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Count word occurrences, one sentence per input line.
    WordFreq(InputArgs),

    /// Map every sentence to its length in characters.
    SentenceLength(InputArgs),

    /// Serve one process-backend request on stdin/stdout.
    #[command(hide = true)]
    Worker,
}

/// Where sentences come from.
#[derive(Debug, Clone, Args)]
pub struct InputArgs {
    /// Input files, one sentence per line. Reads stdin when none are given.
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Use the built-in sample rhyme, repeated N times, instead of input.
    #[arg(long, value_name = "N", conflicts_with = "files")]
    pub sample: Option<usize>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
