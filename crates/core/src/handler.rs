// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Adapters from raw completions to success/error handlers.

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{RequestError, Result};
use crate::request::{RequestStatus, Response};
use crate::scheduler::Completion;

/// Maps a finalized request to a response or an error.
///
/// Only a 2xx response counts as success.
pub fn into_result(completion: &Completion) -> Result<Response> {
    match (completion.status, completion.response.as_ref()) {
        (RequestStatus::Succeeded, Some(response)) if response.is_success() => Ok(response.clone()),
        (RequestStatus::Succeeded, Some(response)) => Err(RequestError::Http {
            status: response.status,
            message: response.text(),
        }),
        (RequestStatus::Succeeded, None) => Err(RequestError::Decode("missing response".to_string())),
        (RequestStatus::FailedConnectionError, _) => Err(RequestError::Network),
        (RequestStatus::Failed, _) => Err(RequestError::Cancelled),
        (RequestStatus::NotStarted | RequestStatus::Processing, _) => Err(RequestError::Timeout),
    }
}

/// Builds a completion callback that splits into success and error paths.
pub fn result_handler<S, E>(on_success: S, on_error: E) -> impl FnOnce(Completion) + Send + 'static
where
    S: FnOnce(Response) + Send + 'static,
    E: FnOnce(RequestError) + Send + 'static,
{
    move |completion: Completion| match into_result(&completion) {
        Ok(response) => on_success(response),
        Err(err) => {
            debug!("{} failed: {}", completion.request.describe(), err);
            on_error(err)
        }
    }
}

/// Like [`result_handler`], decoding the response body as JSON first.
pub fn json_handler<T, S, E>(on_success: S, on_error: E) -> impl FnOnce(Completion) + Send + 'static
where
    T: DeserializeOwned + 'static,
    S: FnOnce(T) + Send + 'static,
    E: FnOnce(RequestError) + Send + 'static,
{
    move |completion: Completion| match into_result(&completion).and_then(|r| decode::<T>(&r)) {
        Ok(value) => on_success(value),
        Err(err) => {
            debug!("{} failed: {}", completion.request.describe(), err);
            on_error(err)
        }
    }
}

fn decode<T: DeserializeOwned>(response: &Response) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| RequestError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
