// src/engine/mapper.rs

//! The mapping callback.
//!
//! A [`Mapper`] turns one input item into one output value and may fail.
//! Mappers run concurrently on the execution backend, so they get `&self`
//! and never see the job's accumulator.
//!
//! Mappers that should also run under the process backend expose a
//! [`PortableMapper`]: the name under which a worker process has the mapper
//! registered plus the mapper's serialized state. Closures adapted with
//! [`map_fn`] have no such description and are refused by the process backend
//! when the engine is constructed.

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Caller-supplied mapping function.
pub trait Mapper: Send + Sync + 'static {
    type Item;
    type Output;

    /// Map a single item. Errors are captured per item by the engine.
    fn map(&self, item: &Self::Item) -> anyhow::Result<Self::Output>;

    /// How a worker process can rebuild this mapper, if it can.
    fn portable(&self) -> Option<PortableMapper> {
        None
    }
}

/// Registered name plus serialized state of a mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortableMapper {
    name: String,
    state: serde_json::Value,
}

impl PortableMapper {
    /// Describe `state` as the mapper registered under `name`.
    pub fn new(name: impl Into<String>, state: &impl Serialize) -> serde_json::Result<Self> {
        Ok(Self {
            name: name.into(),
            state: serde_json::to_value(state)?,
        })
    }

    /// A mapper without configuration; the worker rebuilds it from `null`.
    pub fn stateless(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: serde_json::Value::Null,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &serde_json::Value {
        &self.state
    }
}

/// [`Mapper`] backed by a plain closure. Build one with [`map_fn`].
pub struct FnMapper<F, I, O> {
    f: F,
    _types: PhantomData<fn(&I) -> O>,
}

impl<F, I, O> fmt::Debug for FnMapper<F, I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMapper").finish_non_exhaustive()
    }
}

/// Adapt a closure into a thread-backend [`Mapper`].
///
/// ```ignore
/// let lengths = map_fn(|s: &String| Ok(s.len()));
/// ```
pub fn map_fn<I, O, F>(f: F) -> FnMapper<F, I, O>
where
    F: Fn(&I) -> anyhow::Result<O> + Send + Sync + 'static,
{
    FnMapper {
        f,
        _types: PhantomData,
    }
}

impl<F, I, O> Mapper for FnMapper<F, I, O>
where
    F: Fn(&I) -> anyhow::Result<O> + Send + Sync + 'static,
    I: 'static,
    O: 'static,
{
    type Item = I;
    type Output = O;

    fn map(&self, item: &I) -> anyhow::Result<O> {
        (self.f)(item)
    }
}
