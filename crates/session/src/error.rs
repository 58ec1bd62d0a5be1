// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for session operations.

use thiserror::Error;

use crate::socket::SocketError;

/// Errors surfaced by the connection, the router and the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The connection is not open.
    #[error("not connected")]
    NotConnected,

    /// The connection was lost before a response arrived.
    #[error("disconnected before a response arrived")]
    Disconnected,

    /// No response arrived within the response timeout.
    #[error("no response within the timeout")]
    Timeout,

    /// The remote answered with a non-zero error code.
    #[error("remote error {code}: {message}")]
    Remote { code: i32, message: String },

    /// An inbound frame could not be decoded.
    #[error("failed to parse frame: {0}")]
    Parse(String),

    /// An outbound frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(String),

    /// The socket refused the operation.
    #[error(transparent)]
    Socket(#[from] SocketError),
}

impl SessionError {
    /// Remote error code, if the remote reported one.
    pub fn remote_code(&self) -> Option<i32> {
        match self {
            SessionError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// A specialized Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
