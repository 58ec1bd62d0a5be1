// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic batching of small items into one scheduled request.
//!
//! Items are queued with their own callbacks and flushed together once the
//! flush interval has passed. The single result of the batch request is fanned
//! out to every item's callback. Items of an "immediate" kind skip the queue
//! and are sent on their own right away.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{RequestError, Result};
use crate::handler::into_result;
use crate::request::HttpRequest;
use crate::scheduler::{Completion, RetryScheduler, SchedulerState};

/// Shortest allowed flush interval.
pub const MIN_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

fn default_interval_ms() -> u64 {
    60_000
}

/// Configuration for an [`EventBatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Time between flushes (milliseconds). Clamped to at least 5 seconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Item kinds sent immediately instead of queued.
    #[serde(default)]
    pub immediate: Vec<String>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            interval_ms: default_interval_ms(),
            immediate: Vec::new(),
        }
    }
}

impl BatchConfig {
    /// Flush interval after clamping.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms).max(MIN_FLUSH_INTERVAL)
    }
}

/// An item that can be batched.
pub trait Batched {
    /// Kind of the item, matched against the immediate list.
    fn kind(&self) -> &str;
}

type SuccessCallback = Box<dyn FnOnce() + Send>;
type ErrorCallback = Box<dyn FnOnce(RequestError) + Send>;
type BuildRequest<T> = Box<dyn Fn(&[T]) -> Result<Arc<dyn HttpRequest>> + Send>;

struct Queued<T> {
    item: T,
    on_success: SuccessCallback,
    on_error: ErrorCallback,
}

/// Queues items and flushes them through a [`RetryScheduler`].
pub struct EventBatcher<T> {
    config: BatchConfig,
    build: BuildRequest<T>,
    queue: Vec<Queued<T>>,
    last_flush: Option<Instant>,
    shutting_down: bool,
}

impl<T: Batched> EventBatcher<T> {
    /// Creates a batcher. `build` turns a batch of items into one request.
    ///
    /// If `build` fails, every item in the batch gets its error.
    pub fn new<B>(config: BatchConfig, build: B) -> Self
    where
        B: Fn(&[T]) -> Result<Arc<dyn HttpRequest>> + Send + 'static,
    {
        warn_if_clamped(&config);
        EventBatcher {
            config,
            build: Box::new(build),
            queue: Vec::new(),
            last_flush: None,
            shutting_down: false,
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Replaces the configuration.
    pub fn set_config(&mut self, config: BatchConfig) {
        warn_if_clamped(&config);
        self.config = config;
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queues an item, or sends it right away if its kind is immediate.
    ///
    /// After shutdown the item is rejected with [`RequestError::ShuttingDown`].
    pub fn send<S, E>(
        &mut self,
        item: T,
        on_success: S,
        on_error: E,
        scheduler: &mut RetryScheduler,
        now: Instant,
    ) where
        S: FnOnce() + Send + 'static,
        E: FnOnce(RequestError) + Send + 'static,
    {
        if self.shutting_down {
            on_error(RequestError::ShuttingDown);
            return;
        }

        let queued = Queued {
            item,
            on_success: Box::new(on_success),
            on_error: Box::new(on_error),
        };

        if self.config.immediate.iter().any(|k| k == queued.item.kind()) {
            debug!("sending {} immediately", queued.item.kind());
            self.submit(vec![queued], scheduler, now);
        } else {
            self.queue.push(queued);
        }
    }

    /// Flushes the queue if the interval has passed. Returns true on flush.
    pub fn tick(&mut self, scheduler: &mut RetryScheduler, now: Instant) -> bool {
        let last = *self.last_flush.get_or_insert(now);
        if now.saturating_duration_since(last) < self.config.interval() {
            return false;
        }
        self.flush(scheduler, now);
        true
    }

    /// Sends every queued item as one request.
    pub fn flush(&mut self, scheduler: &mut RetryScheduler, now: Instant) {
        self.last_flush = Some(now);
        if self.queue.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.queue);
        debug!("flushing batch of {} item(s)", batch.len());
        self.submit(batch, scheduler, now);
    }

    /// Flushes once and stops accepting items.
    pub fn shutdown(&mut self, scheduler: &mut RetryScheduler, now: Instant) {
        self.flush(scheduler, now);
        self.shutting_down = true;
    }

    fn submit(&self, batch: Vec<Queued<T>>, scheduler: &mut RetryScheduler, now: Instant) {
        if scheduler.state() != SchedulerState::Initialized {
            warn!(
                "dropping batch of {} item(s): retry scheduler is {}",
                batch.len(),
                scheduler.state()
            );
            for queued in batch {
                (queued.on_error)(RequestError::ShuttingDown);
            }
            return;
        }

        let mut items = Vec::with_capacity(batch.len());
        let mut callbacks = Vec::with_capacity(batch.len());
        for queued in batch {
            items.push(queued.item);
            callbacks.push((queued.on_success, queued.on_error));
        }

        let request = match (self.build)(&items) {
            Ok(request) => request,
            Err(err) => {
                warn!("cannot build batch of {} item(s): {}", items.len(), err);
                for (_, on_error) in callbacks {
                    on_error(err.clone());
                }
                return;
            }
        };
        let fan_out = move |completion: Completion| {
            let result = into_result(&completion);
            for (on_success, on_error) in callbacks {
                match &result {
                    Ok(_) => on_success(),
                    Err(err) => on_error(err.clone()),
                }
            }
        };

        if let Err(err) = scheduler.submit(request, fan_out, now) {
            warn!("dropping batch of {} item(s): {}", items.len(), err);
        }
    }
}

fn warn_if_clamped(config: &BatchConfig) {
    if Duration::from_millis(config.interval_ms) < MIN_FLUSH_INTERVAL {
        warn!(
            "batch interval {}ms is below the minimum; using {:?}",
            config.interval_ms, MIN_FLUSH_INTERVAL
        );
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
