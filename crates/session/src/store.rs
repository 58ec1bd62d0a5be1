// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Optimistic-concurrency writes to a shared store.
//!
//! A write reads the current value and its version, applies a transform, and
//! writes the result tagged with the version it read. If someone else wrote
//! in between, the store answers with a conflict and the cycle starts over,
//! up to a fixed number of attempts.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// A stored value and the version it was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Versioned {
    #[serde(default)]
    pub value: Value,
    /// Version stamp; a write must present the stamp it read.
    pub updated_at: i64,
}

/// Errors from a single store operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The value changed since it was read.
    #[error("version conflict")]
    Conflict,

    /// The store rejected the operation.
    #[error("store error {code}: {message}")]
    Remote { code: i32, message: String },

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Terminal failure of an optimistic write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WriteError {
    /// Every attempt hit a conflict.
    #[error("write still conflicting after {attempts} attempt(s)")]
    Conflict { attempts: u32 },

    /// A read or write failed for another reason.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Versioned key/value store.
pub trait SharedStore: Send + Sync {
    /// Reads a resource.
    fn read(
        &self,
        resource: &str,
    ) -> Pin<Box<dyn Future<Output = StoreResult<Versioned>> + Send + '_>>;

    /// Writes a resource if its version is still `expected_updated_at`.
    fn write(
        &self,
        resource: &str,
        value: Value,
        expected_updated_at: i64,
    ) -> Pin<Box<dyn Future<Output = StoreResult<Versioned>> + Send + '_>>;
}

fn default_max_attempts() -> u32 {
    3
}

/// Configuration for optimistic writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Total write submissions per call, including the first. At least 1.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        WriterConfig {
            max_attempts: default_max_attempts(),
        }
    }
}

/// Runs the read-transform-write cycle until it succeeds or the attempt
/// budget is spent.
pub async fn write_with_retry<S, T>(
    store: &S,
    resource: &str,
    max_attempts: u32,
    mut transform: T,
) -> Result<Versioned, WriteError>
where
    S: SharedStore + ?Sized,
    T: FnMut(Value) -> Value + Send,
{
    let max_attempts = max_attempts.max(1);
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let current = store.read(resource).await?;
        let next = transform(current.value);

        match store.write(resource, next, current.updated_at).await {
            Ok(written) => {
                debug!("wrote {} after {} attempt(s)", resource, attempts);
                return Ok(written);
            }
            Err(StoreError::Conflict) if attempts < max_attempts => {
                debug!("conflict writing {} (attempt {}); re-reading", resource, attempts);
            }
            Err(StoreError::Conflict) => {
                warn!("giving up writing {}: conflict after {} attempt(s)", resource, attempts);
                return Err(WriteError::Conflict { attempts });
            }
            Err(e) => return Err(e.into()),
        }
    }
}

type Transform = Box<dyn FnMut(Value) -> Value + Send>;
type SuccessCallback = Box<dyn FnOnce(Versioned) + Send>;
type ErrorCallback = Box<dyn FnOnce(WriteError) + Send>;

/// A write waiting to run, with its callbacks.
///
/// Consumed by [`PendingWrite::run`]; exactly one callback fires.
pub struct PendingWrite {
    resource: String,
    max_attempts: u32,
    transform: Transform,
    on_success: SuccessCallback,
    on_error: ErrorCallback,
}

impl PendingWrite {
    pub fn new<T, S, E>(
        resource: impl Into<String>,
        max_attempts: u32,
        transform: T,
        on_success: S,
        on_error: E,
    ) -> Self
    where
        T: FnMut(Value) -> Value + Send + 'static,
        S: FnOnce(Versioned) + Send + 'static,
        E: FnOnce(WriteError) + Send + 'static,
    {
        PendingWrite {
            resource: resource.into(),
            max_attempts,
            transform: Box::new(transform),
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        }
    }

    /// Runs the write against `store` and fires the matching callback.
    pub async fn run<S: SharedStore + ?Sized>(self, store: &S) {
        let PendingWrite {
            resource,
            max_attempts,
            transform,
            on_success,
            on_error,
        } = self;

        match write_with_retry(store, &resource, max_attempts, transform).await {
            Ok(written) => on_success(written),
            Err(e) => on_error(e),
        }
    }
}

/// Optimistic writer bound to one store.
pub struct OptimisticWriter<S> {
    store: S,
    config: WriterConfig,
}

impl<S: SharedStore> OptimisticWriter<S> {
    pub fn new(store: S, config: WriterConfig) -> Self {
        OptimisticWriter { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: WriterConfig) {
        self.config = config;
    }

    /// Updates `resource` with `transform`, returning the written value.
    pub async fn update<T>(&self, resource: &str, transform: T) -> Result<Versioned, WriteError>
    where
        T: FnMut(Value) -> Value + Send,
    {
        write_with_retry(&self.store, resource, self.config.max_attempts, transform).await
    }

    /// Updates `resource` and reports the outcome through callbacks.
    pub async fn write<T, F, E>(&self, resource: &str, transform: T, on_success: F, on_error: E)
    where
        T: FnMut(Value) -> Value + Send + 'static,
        F: FnOnce(Versioned) + Send + 'static,
        E: FnOnce(WriteError) + Send + 'static,
    {
        self.write_with_attempts(
            resource,
            self.config.max_attempts,
            transform,
            on_success,
            on_error,
        )
        .await
    }

    /// Like [`OptimisticWriter::write`], with a per-call attempt budget in
    /// place of the configured one.
    pub async fn write_with_attempts<T, F, E>(
        &self,
        resource: &str,
        max_attempts: u32,
        transform: T,
        on_success: F,
        on_error: E,
    ) where
        T: FnMut(Value) -> Value + Send + 'static,
        F: FnOnce(Versioned) + Send + 'static,
        E: FnOnce(WriteError) + Send + 'static,
    {
        PendingWrite::new(resource, max_attempts, transform, on_success, on_error)
            .run(&self.store)
            .await
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
