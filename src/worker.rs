// src/worker.rs

//! Worker side of the process backend.
//!
//! A worker process receives one [`WorkerRequest`] on stdin, rebuilds the
//! named mapper from the registry, maps the item and writes one
//! [`WorkerReply`] to stdout. Mapping errors become error replies; a panic
//! simply kills the worker, which the dispatcher reports as a worker exit.

use std::collections::BTreeMap;
use std::fmt;

use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

use crate::engine::Mapper;
use crate::errors::Result;
use crate::exec::{WorkerReply, WorkerRequest};

type MapEntry = Box<dyn Fn(&Value, Value) -> anyhow::Result<Value> + Send + Sync>;

/// Mappers a worker process knows how to rebuild, by name.
#[derive(Default)]
pub struct WorkerRegistry {
    mappers: BTreeMap<String, MapEntry>,
}

impl fmt::Debug for WorkerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerRegistry")
            .field("mappers", &self.mappers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make mapper type `M` available under `name`.
    ///
    /// `name` must match the name in `M`'s [`PortableMapper`] description.
    ///
    /// [`PortableMapper`]: crate::engine::PortableMapper
    pub fn register<M>(&mut self, name: impl Into<String>) -> &mut Self
    where
        M: Mapper + DeserializeOwned,
        M::Item: DeserializeOwned,
        M::Output: Serialize,
    {
        let entry: MapEntry = Box::new(|state: &Value, item: Value| {
            let mapper: M =
                serde_json::from_value(state.clone()).context("rebuilding mapper state")?;
            let item: M::Item = serde_json::from_value(item).context("decoding item")?;
            let value = mapper.map(&item)?;
            serde_json::to_value(value).context("encoding mapped value")
        });

        self.mappers.insert(name.into(), entry);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.mappers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mappers.keys().map(String::as_str)
    }

    /// Serve a decoded request.
    pub fn handle(&self, request: WorkerRequest) -> WorkerReply {
        let Some(entry) = self.mappers.get(&request.mapper) else {
            warn!(mapper = %request.mapper, "request for unregistered mapper");
            return WorkerReply::error(format!(
                "no mapper registered under '{}'",
                request.mapper
            ));
        };

        match entry(&request.state, request.item) {
            Ok(value) => WorkerReply::Ok { value },
            Err(err) => WorkerReply::error(format!("{err:#}")),
        }
    }

    /// Serve a raw request as read from stdin.
    pub fn handle_bytes(&self, bytes: &[u8]) -> WorkerReply {
        match WorkerRequest::from_bytes(bytes) {
            Ok(request) => self.handle(request),
            Err(err) => WorkerReply::error(format!("malformed worker request: {err}")),
        }
    }

    /// Read one request from stdin and write the reply to stdout.
    pub async fn serve_stdio(&self) -> Result<()> {
        let mut input = Vec::new();
        tokio::io::stdin().read_to_end(&mut input).await?;
        debug!(bytes = input.len(), "worker received request");

        let reply = self.handle_bytes(&input).to_bytes()?;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(&reply).await?;
        stdout.flush().await?;
        Ok(())
    }
}
