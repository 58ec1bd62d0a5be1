// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry scheduler for request/response calls.
//!
//! The scheduler owns a set of in-flight requests and is driven by periodic
//! calls to [`RetryScheduler::tick`]. On every tick it re-issues requests whose
//! retry time has come, classifies the status of every request, and finalizes
//! the ones that reached a terminal outcome:
//!
//! ```text
//! Processing            ── budget spent ──► cancel (wait for terminal status)
//! Succeeded 5xx gateway ── budget left  ──► arm retry (backoff)
//!                       ── budget spent ──► finalize
//! Succeeded 403         ──────────────────► finalize
//! Succeeded other       ──────────────────► finalize
//! NotStarted            ── budget spent ──► finalize
//! Connection error      ── budget left  ──► arm retry (backoff)
//!                       ── budget spent ──► finalize
//! Cancelled             ──────────────────► finalize
//! ```
//!
//! Retries are bounded by a wall-clock budget, not an attempt count.
//! Completion callbacks run only after the whole scan has finished, so a
//! callback may submit new requests.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backoff::{BackoffPolicy, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY, DEFAULT_TOTAL_TIMEOUT};
use crate::error::SchedulerError;
use crate::jitter::{JitterSource, RandomJitter};
use crate::request::{classify, HttpRequest, RequestStatus, Response, ResponseClass};

/// Configuration for the retry scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry (milliseconds).
    pub initial_delay_ms: u64,
    /// Maximum delay between retries (milliseconds).
    pub max_delay_ms: u64,
    /// Wall-clock budget per request, measured from submission (milliseconds).
    pub total_timeout_ms: u64,
    /// Period of the tick driver (milliseconds).
    pub tick_interval_ms: u64,
    /// How long shutdown waits for in-flight requests (milliseconds). 0 = no wait.
    pub flush_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            initial_delay_ms: DEFAULT_INITIAL_DELAY.as_millis() as u64,
            max_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
            total_timeout_ms: DEFAULT_TOTAL_TIMEOUT.as_millis() as u64,
            tick_interval_ms: 200,
            flush_timeout_ms: 0,
        }
    }
}

impl RetryConfig {
    /// Backoff policy described by this configuration.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            Duration::from_millis(self.total_timeout_ms),
        )
    }

    /// Period of the tick driver.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Flush wait on shutdown, if configured.
    pub fn flush_timeout(&self) -> Option<Duration> {
        (self.flush_timeout_ms > 0).then(|| Duration::from_millis(self.flush_timeout_ms))
    }
}

/// Lifecycle of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created but not started; requests are refused.
    Uninitialized,
    /// Accepting and retrying requests.
    Initialized,
    /// Terminal; requests are refused.
    ShuttingDown,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SchedulerState::Uninitialized => "uninitialized",
            SchedulerState::Initialized => "initialized",
            SchedulerState::ShuttingDown => "shutting down",
        };
        write!(f, "{}", s)
    }
}

/// Final state of a request, handed to its completion callback.
#[derive(Clone)]
pub struct Completion {
    /// The request handle that was submitted.
    pub request: Arc<dyn HttpRequest>,
    /// Status snapshot at finalization.
    pub status: RequestStatus,
    /// Response of the last execution, if one arrived.
    pub response: Option<Response>,
    /// Whether the request reached a terminal status (as opposed to never
    /// starting before its budget ran out).
    pub finished: bool,
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("request", &self.request.describe())
            .field("status", &self.status)
            .field("response", &self.response)
            .field("finished", &self.finished)
            .finish()
    }
}

/// Callback fired once when a request is finalized.
pub type CompletionCallback = Box<dyn FnOnce(Completion) + Send>;

/// A finalized request whose callback has not fired yet.
pub struct Finalized {
    completion: Completion,
    callback: CompletionCallback,
}

impl Finalized {
    /// The completion that will be passed to the callback.
    pub fn completion(&self) -> &Completion {
        &self.completion
    }

    /// Fires the completion callback.
    pub fn fire(self) {
        (self.callback)(self.completion);
    }
}

impl fmt::Debug for Finalized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Finalized").field(&self.completion).finish()
    }
}

/// Bookkeeping for one submitted request.
struct RetryTask {
    request: Arc<dyn HttpRequest>,
    on_complete: CompletionCallback,
    started_at: Instant,
    delay: Option<Duration>,
    next_retry_at: Instant,
    armed: bool,
}

impl RetryTask {
    fn arm(&mut self, now: Instant, policy: &BackoffPolicy, jitter: &mut dyn JitterSource) {
        let delay = policy.advance(self.delay, jitter);
        self.delay = Some(delay);
        self.next_retry_at = policy.retry_at(now, self.started_at, delay);
        self.armed = true;

        debug!(
            "retrying {} in {:?} (elapsed {:?})",
            self.request.describe(),
            self.next_retry_at.saturating_duration_since(now),
            now.saturating_duration_since(self.started_at)
        );
    }

    /// Runs one tick for this task. Returns true when the task is finished.
    fn step(&mut self, now: Instant, policy: &BackoffPolicy, jitter: &mut dyn JitterSource) -> bool {
        if self.armed {
            if now < self.next_retry_at {
                return false;
            }
            self.armed = false;
            debug!("re-issuing {}", self.request.describe());
            self.request.process();
        }

        let exhausted = policy.is_exhausted(now, self.started_at);

        match self.request.status() {
            RequestStatus::Processing => {
                if exhausted {
                    warn!("cancelling {}: timeout budget spent", self.request.describe());
                    self.request.cancel();
                }
                false
            }
            RequestStatus::Succeeded => {
                let status = self.request.response().map_or(0, |r| r.status);
                match classify(status) {
                    ResponseClass::Transient if exhausted => {
                        warn!(
                            "giving up on {} after status {}: timeout budget spent",
                            self.request.describe(),
                            status
                        );
                        true
                    }
                    ResponseClass::Transient => {
                        self.arm(now, policy, jitter);
                        false
                    }
                    ResponseClass::Rejected | ResponseClass::Done => true,
                }
            }
            RequestStatus::NotStarted => exhausted,
            RequestStatus::FailedConnectionError => {
                if exhausted {
                    warn!(
                        "giving up on {}: remote unreachable for {:?}",
                        self.request.describe(),
                        policy.total_timeout
                    );
                    true
                } else {
                    self.arm(now, policy, jitter);
                    false
                }
            }
            RequestStatus::Failed => true,
        }
    }

    fn finalize(self) -> Finalized {
        let status = self.request.status();
        let completion = Completion {
            response: self.request.response(),
            finished: status.is_finished(),
            status,
            request: self.request,
        };
        Finalized {
            completion,
            callback: self.on_complete,
        }
    }
}

/// Tick-driven retry scheduler.
pub struct RetryScheduler {
    state: SchedulerState,
    config: RetryConfig,
    policy: BackoffPolicy,
    jitter: Box<dyn JitterSource>,
    tasks: Vec<RetryTask>,
}

impl RetryScheduler {
    /// Creates an uninitialized scheduler with random jitter.
    pub fn new(config: RetryConfig) -> Self {
        Self::with_jitter(config, RandomJitter)
    }

    /// Creates an uninitialized scheduler with a custom jitter source.
    pub fn with_jitter(config: RetryConfig, jitter: impl JitterSource + 'static) -> Self {
        RetryScheduler {
            state: SchedulerState::Uninitialized,
            policy: config.backoff(),
            config,
            jitter: Box::new(jitter),
            tasks: Vec::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Current configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Replaces the configuration. Applies to active tasks from the next tick.
    pub fn set_config(&mut self, config: RetryConfig) {
        self.policy = config.backoff();
        self.config = config;
    }

    /// Number of active tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether there are no active tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of active tasks whose request is currently on the wire.
    pub fn in_flight(&self) -> usize {
        self.tasks
            .iter()
            .filter(|task| task.request.status() == RequestStatus::Processing)
            .count()
    }

    /// Starts accepting requests.
    pub fn startup(&mut self) {
        if self.state == SchedulerState::Uninitialized {
            self.state = SchedulerState::Initialized;
            debug!("retry scheduler initialized");
        }
    }

    /// Issues a request and tracks it until it reaches a terminal outcome.
    ///
    /// Refused when the scheduler has not started or is shutting down; the
    /// callback is dropped in that case.
    pub fn submit<F>(
        &mut self,
        request: Arc<dyn HttpRequest>,
        on_complete: F,
        now: Instant,
    ) -> Result<(), SchedulerError>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        if self.state != SchedulerState::Initialized {
            warn!(
                "cannot process {}: retry scheduler is {}",
                request.describe(),
                self.state
            );
            return Err(SchedulerError::NotRunning(self.state));
        }

        debug!("issuing {}", request.describe());
        if !request.process() {
            debug!("{} did not start", request.describe());
        }

        self.tasks.push(RetryTask {
            request,
            on_complete: Box::new(on_complete),
            started_at: now,
            delay: None,
            next_retry_at: now,
            armed: false,
        });
        Ok(())
    }

    /// Advances every task and returns the ones that finished, without
    /// firing their callbacks.
    pub fn poll(&mut self, now: Instant) -> Vec<Finalized> {
        let tasks = std::mem::take(&mut self.tasks);
        let mut finished = Vec::new();

        for mut task in tasks {
            if task.step(now, &self.policy, self.jitter.as_mut()) {
                finished.push(task);
            } else {
                self.tasks.push(task);
            }
        }

        finished.into_iter().map(RetryTask::finalize).collect()
    }

    /// Advances every task and fires the callbacks of finished ones.
    ///
    /// Returns the number of requests finalized.
    pub fn tick(&mut self, now: Instant) -> usize {
        let finished = self.poll(now);
        let count = finished.len();
        for done in finished {
            done.fire();
        }
        count
    }

    /// Enters `ShuttingDown` and drains the active set.
    ///
    /// Requests that already reached a terminal status are returned for
    /// best-effort delivery. Requests still on the wire are cancelled and
    /// their tasks discarded without a callback.
    pub fn drain_for_shutdown(&mut self) -> Vec<Finalized> {
        self.state = SchedulerState::ShuttingDown;

        let mut flushed = Vec::new();
        let mut discarded = 0usize;

        for task in std::mem::take(&mut self.tasks) {
            match task.request.status() {
                status if status.is_finished() => flushed.push(task.finalize()),
                RequestStatus::Processing => {
                    task.request.cancel();
                    discarded += 1;
                }
                _ => discarded += 1,
            }
        }

        if discarded > 0 {
            warn!(
                "retry scheduler shut down with {} unfinished request(s); they were cancelled",
                discarded
            );
        }
        flushed
    }

    /// Shuts down, firing callbacks for requests that already finished.
    pub fn shutdown(&mut self) {
        for done in self.drain_for_shutdown() {
            done.fire();
        }
    }
}

impl fmt::Debug for RetryScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryScheduler")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
