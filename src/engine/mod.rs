// src/engine/mod.rs

//! Map/reduce engine.
//!
//! This module ties together:
//! - the mapping callback ([`mapper`]) that runs on the execution backend
//! - the draining loop ([`job`]) that owns the accumulator, calls the reducer
//!   on its own task and drives the progress tracker
//! - the [`collector`] convenience specialization
//!
//! The values shared between these pieces (outcomes and failures) live here.

use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub mod collector;
pub mod job;
pub mod mapper;

pub use collector::Collector;
pub use job::{Engine, JobSummary};
pub use mapper::{FnMapper, Mapper, PortableMapper, map_fn};

/// Values that can travel to either kind of backend.
///
/// Process workers exchange items and mapped values as JSON, so every item
/// and output type must round-trip through serde.
pub trait Payload: Serialize + DeserializeOwned + Send + 'static {}

impl<T> Payload for T where T: Serialize + DeserializeOwned + Send + 'static {}

/// Why a unit of work failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The mapper returned an error.
    Error,
    /// The mapper panicked (thread backend) or its task was torn down.
    Panic,
    /// A worker process exited unsuccessfully.
    WorkerExit { code: Option<i32> },
    /// A worker process replied with something that is not a valid reply.
    Protocol,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Error => write!(f, "error"),
            FailureKind::Panic => write!(f, "panic"),
            FailureKind::WorkerExit { code: Some(code) } => write!(f, "worker exit {code}"),
            FailureKind::WorkerExit { code: None } => write!(f, "worker killed"),
            FailureKind::Protocol => write!(f, "protocol"),
        }
    }
}

/// Captured description of a mapping fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapFailure {
    kind: FailureKind,
    message: String,
}

impl MapFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Failure from an `anyhow` error, keeping the whole context chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self::new(FailureKind::Error, format!("{err:#}"))
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for MapFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for MapFailure {}

/// Resolved result of one unit of work, handed to the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<O> {
    Success(O),
    Failure(MapFailure),
}

impl<O> Outcome<O> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// The mapped value, if the unit of work succeeded.
    pub fn value(self) -> Option<O> {
        match self {
            Outcome::Success(value) => Some(value),
            Outcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&MapFailure> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    /// Split into the `(value, failure)` pair a reducer usually wants.
    pub fn into_parts(self) -> (Option<O>, Option<MapFailure>) {
        match self {
            Outcome::Success(value) => (Some(value), None),
            Outcome::Failure(failure) => (None, Some(failure)),
        }
    }
}

impl<O> From<anyhow::Result<O>> for Outcome<O> {
    fn from(result: anyhow::Result<O>) -> Self {
        match result {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Failure(MapFailure::from_error(&err)),
        }
    }
}
