// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Wire envelope for session frames.
//!
//! Every frame is a JSON object:
//!
//! ```text
//! {"type": "partyInfoRequest", "id": "tether-7", "code": 0, "payload": {...}}
//! ```
//!
//! Requests end in `Request`; the matching response replaces the suffix with
//! `Response` and echoes the request `id`. Frames without a pending request
//! are notifications.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SessionError};

/// Keepalive frame sent while connected.
pub const PING: &str = "ping";

/// Server notice that it is about to close the connection.
pub const DISCONNECT_NOTIF: &str = "disconnectNotif";

/// Reads a stored resource.
pub const STORE_READ_REQUEST: &str = "storeReadRequest";

/// Writes a stored resource, tagged with the expected version.
pub const STORE_WRITE_REQUEST: &str = "storeWriteRequest";

/// Response code for a version mismatch on write.
pub const CONFLICT_CODE: i32 = 412;

const REQUEST_SUFFIX: &str = "Request";
const RESPONSE_SUFFIX: &str = "Response";

/// One frame on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Correlation id; echoed by responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Result code on responses; 0 or absent means success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
    /// Type-specific body.
    #[serde(default)]
    pub payload: Value,
}

impl Frame {
    /// Creates a frame with no id or code.
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Frame {
            kind: kind.into(),
            id: None,
            code: None,
            payload,
        }
    }

    /// Sets the correlation id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the result code.
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = Some(code);
        self
    }

    /// Creates a keepalive frame.
    pub fn ping(id: impl Into<String>) -> Self {
        Frame::new(PING, Value::Null).with_id(id)
    }

    /// Non-zero result code, if any.
    pub fn error_code(&self) -> Option<i32> {
        self.code.filter(|code| *code != 0)
    }

    /// Error message carried by a failed response.
    pub fn error_message(&self) -> String {
        self.payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.payload.to_string())
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SessionError::Encode(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SessionError::Parse(e.to_string()))
    }
}

/// Response type for a request type, e.g. `joinRequest` -> `joinResponse`.
///
/// Types without the request suffix get the response suffix appended.
pub fn response_type(request_kind: &str) -> String {
    match request_kind.strip_suffix(REQUEST_SUFFIX) {
        Some(stem) => format!("{}{}", stem, RESPONSE_SUFFIX),
        None => format!("{}{}", request_kind, RESPONSE_SUFFIX),
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
