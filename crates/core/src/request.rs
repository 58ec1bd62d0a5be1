// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request handles observed by the retry scheduler.
//!
//! A request handle wraps a fully prepared request and the transport that
//! executes it. The scheduler only ever *observes* a handle: it starts it,
//! cancels it and reads status snapshots during a tick. The transport itself
//! may run on any thread.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single request execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    /// Not started yet (or could not be started).
    NotStarted,
    /// Sent, waiting for a response.
    Processing,
    /// A response arrived. Its status code may still be an error.
    Succeeded,
    /// Cancelled before a response arrived.
    Failed,
    /// The remote could not be reached.
    FailedConnectionError,
}

impl RequestStatus {
    /// Whether the request reached a terminal state.
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            RequestStatus::Succeeded | RequestStatus::Failed | RequestStatus::FailedConnectionError
        )
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestStatus::NotStarted => "not_started",
            RequestStatus::Processing => "processing",
            RequestStatus::Succeeded => "succeeded",
            RequestStatus::Failed => "failed",
            RequestStatus::FailedConnectionError => "connection_error",
        };
        write!(f, "{}", s)
    }
}

/// How the scheduler treats a response status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// Server overload or gateway trouble; worth retrying.
    Transient,
    /// Explicit rejection; never retried.
    Rejected,
    /// Anything else; the request is done.
    Done,
}

/// Classifies an HTTP status code.
pub fn classify(status: u16) -> ResponseClass {
    match status {
        500 | 502 | 503 | 504 => ResponseClass::Transient,
        403 => ResponseClass::Rejected,
        _ => ResponseClass::Done,
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in arrival order.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: Vec<u8>,
}

impl Response {
    /// Creates a response with a status and body.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Response {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A fully formed request: method, url, headers and body.
///
/// Call sites build these; the scheduler never looks inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedRequest {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body: Vec<u8>,
}

impl PreparedRequest {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        PreparedRequest {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Creates a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    /// Creates a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    /// Adds a header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body and the matching content headers.
    pub fn json<T: Serialize>(self, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(body))
    }
}

impl fmt::Display for PreparedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A request that can be (re-)issued, cancelled and polled.
///
/// Implementations use interior mutability: the scheduler and the caller
/// share the same handle.
pub trait HttpRequest: Send + Sync {
    /// Issues the request, replacing any previous execution.
    ///
    /// Returns `false` if the request could not be started.
    fn process(&self) -> bool;

    /// Best-effort abort of the current execution.
    fn cancel(&self);

    /// Current status snapshot.
    fn status(&self) -> RequestStatus;

    /// Response of the last finished execution, if any.
    fn response(&self) -> Option<Response>;

    /// Short description for logs, e.g. `GET https://host/path`.
    fn describe(&self) -> String;
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
