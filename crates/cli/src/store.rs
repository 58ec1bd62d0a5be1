// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared store reached over a session.
//!
//! Reads and writes are session requests:
//!
//! - `storeReadRequest {resource}` answers with `{value, updatedAt}`.
//! - `storeWriteRequest {resource, value, updatedAt}` answers with the new
//!   `{value, updatedAt}`, or with error code 412 when `updatedAt` is stale.

use std::future::Future;
use std::pin::Pin;

use serde_json::{json, Value};
use tether_session::protocol::{CONFLICT_CODE, STORE_READ_REQUEST, STORE_WRITE_REQUEST};
use tether_session::store::StoreResult;
use tether_session::{Frame, SessionError, SharedStore, StoreError, Versioned};

use crate::driver::SessionHandle;

/// [`SharedStore`] backed by a [`SessionHandle`].
#[derive(Clone)]
pub struct SessionStore {
    session: SessionHandle,
}

impl SessionStore {
    pub fn new(session: SessionHandle) -> Self {
        SessionStore { session }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }
}

impl SharedStore for SessionStore {
    fn read(
        &self,
        resource: &str,
    ) -> Pin<Box<dyn Future<Output = StoreResult<Versioned>> + Send + '_>> {
        let reply = self
            .session
            .call(STORE_READ_REQUEST, json!({ "resource": resource }));
        Box::pin(async move { decode(reply.await.map_err(store_error)?) })
    }

    fn write(
        &self,
        resource: &str,
        value: Value,
        expected_updated_at: i64,
    ) -> Pin<Box<dyn Future<Output = StoreResult<Versioned>> + Send + '_>> {
        let reply = self.session.call(
            STORE_WRITE_REQUEST,
            json!({
                "resource": resource,
                "value": value,
                "updatedAt": expected_updated_at,
            }),
        );
        Box::pin(async move { decode(reply.await.map_err(store_error)?) })
    }
}

fn decode(frame: Frame) -> StoreResult<Versioned> {
    serde_json::from_value(frame.payload)
        .map_err(|e| StoreError::Unavailable(format!("malformed store reply: {}", e)))
}

fn store_error(error: SessionError) -> StoreError {
    match error {
        SessionError::Remote { code, .. } if code == CONFLICT_CODE => StoreError::Conflict,
        SessionError::Remote { code, message } => StoreError::Remote { code, message },
        other => StoreError::Unavailable(other.to_string()),
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
