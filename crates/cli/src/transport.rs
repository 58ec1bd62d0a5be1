// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP request handles backed by reqwest.
//!
//! Each call to [`HttpRequest::process`] spawns a fresh execution on the
//! runtime and supersedes any earlier one. The retry scheduler observes the
//! outcome through status snapshots; a generation counter keeps a superseded
//! or cancelled execution from overwriting newer state.

use std::sync::{Arc, Mutex};

use reqwest::Method;
use tether_core::{HttpRequest, PreparedRequest, RequestStatus, Response};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

struct Execution {
    status: RequestStatus,
    response: Option<Response>,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

/// A [`PreparedRequest`] executed with a shared reqwest client.
pub struct ReqwestRequest {
    client: reqwest::Client,
    prepared: PreparedRequest,
    runtime: Handle,
    execution: Arc<Mutex<Execution>>,
}

impl ReqwestRequest {
    /// Create a handle. Executions are spawned on `runtime`.
    pub fn new(client: reqwest::Client, prepared: PreparedRequest, runtime: Handle) -> Self {
        ReqwestRequest {
            client,
            prepared,
            runtime,
            execution: Arc::new(Mutex::new(Execution {
                status: RequestStatus::NotStarted,
                response: None,
                task: None,
                generation: 0,
            })),
        }
    }

    /// The request being executed.
    pub fn prepared(&self) -> &PreparedRequest {
        &self.prepared
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Execution> {
        self.execution.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn build(&self) -> Result<reqwest::RequestBuilder, String> {
        let method = Method::from_bytes(self.prepared.method.as_bytes())
            .map_err(|e| format!("invalid method {}: {}", self.prepared.method, e))?;
        let mut builder = self.client.request(method, &self.prepared.url);
        for (name, value) in &self.prepared.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !self.prepared.body.is_empty() {
            builder = builder.body(self.prepared.body.clone());
        }
        Ok(builder)
    }
}

impl HttpRequest for ReqwestRequest {
    fn process(&self) -> bool {
        let builder = match self.build() {
            Ok(builder) => builder,
            Err(e) => {
                warn!("cannot start {}: {}", self.prepared, e);
                return false;
            }
        };

        let mut execution = self.lock();
        if let Some(task) = execution.task.take() {
            task.abort();
        }
        execution.generation += 1;
        execution.status = RequestStatus::Processing;
        execution.response = None;

        let generation = execution.generation;
        let shared = Arc::clone(&self.execution);
        let description = self.prepared.to_string();
        execution.task = Some(self.runtime.spawn(async move {
            let outcome = execute(builder).await;
            let mut execution = shared.lock().unwrap_or_else(|e| e.into_inner());
            if execution.generation != generation {
                return;
            }
            match outcome {
                Ok(response) => {
                    debug!("{} -> {}", description, response.status);
                    execution.status = RequestStatus::Succeeded;
                    execution.response = Some(response);
                }
                Err(e) => {
                    debug!("{} failed: {}", description, e);
                    execution.status = RequestStatus::FailedConnectionError;
                }
            }
            execution.task = None;
        }));
        true
    }

    fn cancel(&self) {
        let mut execution = self.lock();
        if let Some(task) = execution.task.take() {
            task.abort();
        }
        execution.generation += 1;
        if execution.status == RequestStatus::Processing {
            execution.status = RequestStatus::Failed;
        }
    }

    fn status(&self) -> RequestStatus {
        self.lock().status
    }

    fn response(&self) -> Option<Response> {
        self.lock().response.clone()
    }

    fn describe(&self) -> String {
        self.prepared.to_string()
    }
}

async fn execute(builder: reqwest::RequestBuilder) -> Result<Response, reqwest::Error> {
    let response = builder.send().await?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    let body = response.bytes().await?.to_vec();
    Ok(Response {
        status,
        headers,
        body,
    })
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
