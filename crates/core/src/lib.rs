// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-core: retry scheduling for request/response calls
//!
//! This crate provides the backoff policy, the tick-driven retry scheduler and
//! the completion helpers shared by the session layer and the tether CLI.
//! Nothing here performs I/O or owns a runtime; callers drive it.

pub mod backoff;
pub mod batch;
pub mod error;
pub mod handler;
pub mod jitter;
pub mod request;
pub mod scheduler;

#[cfg(test)]
mod test_helpers;

pub use backoff::BackoffPolicy;
pub use batch::{BatchConfig, Batched, EventBatcher};
pub use error::{RequestError, Result, SchedulerError};
pub use handler::{into_result, json_handler, result_handler};
pub use jitter::{FixedJitter, JitterSource, RandomJitter};
pub use request::{classify, HttpRequest, PreparedRequest, RequestStatus, Response, ResponseClass};
pub use scheduler::{Completion, CompletionCallback, Finalized, RetryConfig, RetryScheduler, SchedulerState};
