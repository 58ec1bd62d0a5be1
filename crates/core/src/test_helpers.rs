// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for scheduler and handler tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::request::{HttpRequest, RequestStatus, Response};

/// What a mock request does each time it is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Immediately receives a response with this status.
    Respond(u16),
    /// Immediately fails with a connection error.
    ConnectionError,
    /// Stays in flight until cancelled or finished by the test.
    Hang,
    /// Refuses to start.
    Refuse,
}

struct MockInner {
    script: VecDeque<Outcome>,
    fallback: Outcome,
    status: RequestStatus,
    response: Option<Response>,
    processed: usize,
    cancelled: usize,
}

/// Request handle driven by a script of outcomes.
pub struct MockRequest {
    inner: Mutex<MockInner>,
}

impl MockRequest {
    /// A request that behaves the same on every attempt.
    pub fn always(outcome: Outcome) -> Arc<Self> {
        Self::scripted(Vec::new(), outcome)
    }

    /// A request that follows `script`, then repeats `fallback`.
    pub fn scripted(script: Vec<Outcome>, fallback: Outcome) -> Arc<Self> {
        Arc::new(MockRequest {
            inner: Mutex::new(MockInner {
                script: script.into(),
                fallback,
                status: RequestStatus::NotStarted,
                response: None,
                processed: 0,
                cancelled: 0,
            }),
        })
    }

    /// How many times the request was issued.
    pub fn processed(&self) -> usize {
        self.inner.lock().unwrap().processed
    }

    /// How many times the request was cancelled.
    pub fn cancelled(&self) -> usize {
        self.inner.lock().unwrap().cancelled
    }

    /// Completes an in-flight execution with a response.
    pub fn finish(&self, status: u16) {
        let mut inner = self.inner.lock().unwrap();
        inner.status = RequestStatus::Succeeded;
        inner.response = Some(Response::new(status, format!("status {}", status)));
    }
}

impl HttpRequest for MockRequest {
    fn process(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let outcome = inner.script.pop_front().unwrap_or(inner.fallback);
        inner.processed += 1;
        inner.response = None;

        match outcome {
            Outcome::Respond(status) => {
                inner.status = RequestStatus::Succeeded;
                inner.response = Some(Response::new(status, format!("status {}", status)));
                true
            }
            Outcome::ConnectionError => {
                inner.status = RequestStatus::FailedConnectionError;
                true
            }
            Outcome::Hang => {
                inner.status = RequestStatus::Processing;
                true
            }
            Outcome::Refuse => {
                inner.status = RequestStatus::NotStarted;
                false
            }
        }
    }

    fn cancel(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.cancelled += 1;
        if inner.status == RequestStatus::Processing {
            inner.status = RequestStatus::Failed;
        }
    }

    fn status(&self) -> RequestStatus {
        self.inner.lock().unwrap().status
    }

    fn response(&self) -> Option<Response> {
        self.inner.lock().unwrap().response.clone()
    }

    fn describe(&self) -> String {
        "MOCK mock://request".to_string()
    }
}
