// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tether-core operations.

use thiserror::Error;

use crate::scheduler::SchedulerState;

/// Terminal failure of a request, as reported to completion handlers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The remote answered with a non-success status.
    #[error("request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    /// The remote could not be reached before the budget ran out.
    #[error("network error: request could not reach the remote")]
    Network,

    /// The request was cancelled by the caller or by its timeout budget.
    #[error("request cancelled")]
    Cancelled,

    /// The request never started before its budget ran out.
    #[error("request timed out before it could start")]
    Timeout,

    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The request could not be built from its input.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// The component was shutting down and refused the work.
    #[error("shutting down")]
    ShuttingDown,
}

impl RequestError {
    /// Numeric code for the error, in the HTTP status space where possible.
    pub fn code(&self) -> u16 {
        match self {
            RequestError::Http { status, .. } => *status,
            RequestError::Network => 503,
            RequestError::Cancelled => 499,
            RequestError::Timeout => 408,
            RequestError::Decode(_) => 422,
            RequestError::Encode(_) => 400,
            RequestError::ShuttingDown => 503,
        }
    }
}

/// Errors returned synchronously by the retry scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    #[error("retry scheduler is not accepting requests (state: {0})")]
    NotRunning(SchedulerState),
}

/// A specialized Result type for request outcomes.
pub type Result<T> = std::result::Result<T, RequestError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
