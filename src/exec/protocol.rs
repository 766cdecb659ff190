// src/exec/protocol.rs

//! Wire format between the process backend and its worker processes.
//!
//! One request per worker process:
//!
//! ```text
//! stdin  <- {"mapper": "word-freq", "state": null, "item": "x y y"}
//! stdout -> {"status": "ok", "value": {"x": 1, "y": 2}}
//!        or {"status": "error", "message": "sentence has no words"}
//! ```
//!
//! A worker that exits unsuccessfully, or prints anything that does not parse
//! as a reply, is a worker fault; the backend turns both into failures.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::{FailureKind, MapFailure, Outcome, PortableMapper};

/// Longest slice of garbage output quoted back in a protocol failure.
const MAX_QUOTED_OUTPUT: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRequest {
    /// Name the mapper is registered under in the worker.
    pub mapper: String,
    /// Serialized mapper state.
    #[serde(default)]
    pub state: Value,
    pub item: Value,
}

impl WorkerRequest {
    pub fn new(mapper: &PortableMapper, item: &impl Serialize) -> serde_json::Result<Self> {
        Ok(Self {
            mapper: mapper.name().to_string(),
            state: mapper.state().clone(),
            item: serde_json::to_value(item)?,
        })
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WorkerReply {
    Ok { value: Value },
    Error { message: String },
}

impl WorkerReply {
    pub fn error(message: impl Into<String>) -> Self {
        WorkerReply::Error {
            message: message.into(),
        }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode a worker's stdout into the outcome of its unit of work.
    pub fn decode<O: DeserializeOwned>(stdout: &[u8]) -> Outcome<O> {
        match serde_json::from_slice::<WorkerReply>(stdout) {
            Ok(reply) => reply.into_outcome(),
            Err(err) => Outcome::Failure(MapFailure::new(
                FailureKind::Protocol,
                format!("unreadable worker reply ({err}): {:?}", quote(stdout)),
            )),
        }
    }

    pub fn into_outcome<O: DeserializeOwned>(self) -> Outcome<O> {
        match self {
            WorkerReply::Ok { value } => match serde_json::from_value::<O>(value) {
                Ok(value) => Outcome::Success(value),
                Err(err) => Outcome::Failure(MapFailure::new(
                    FailureKind::Protocol,
                    format!("worker value has the wrong shape: {err}"),
                )),
            },
            WorkerReply::Error { message } => {
                Outcome::Failure(MapFailure::new(FailureKind::Error, message))
            }
        }
    }
}

fn quote(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(MAX_QUOTED_OUTPUT) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
