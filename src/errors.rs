// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Mapping faults are *not* errors at this level: they are captured per item
//! and handed to the reducer as [`crate::engine::Outcome::Failure`]. Everything
//! here is either a construction/configuration problem or a fatal job fault.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimpleMrError {
    #[error("parallelism must be >= 1 (got {0})")]
    InvalidParallelism(usize),

    #[error("mapper cannot run in a worker process: {0}")]
    NotPortable(String),

    #[error("worker unavailable: {0}")]
    WorkerUnavailable(String),

    #[error("reduction failed for item {item}: {source:#}")]
    ReduceFailed {
        item: String,
        source: anyhow::Error,
    },

    #[error("execution backend lost track of a task: {0}")]
    LostTask(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SimpleMrError>;
