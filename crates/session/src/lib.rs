// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-session: persistent message sessions
//!
//! This crate provides the reconnecting connection state machine, the
//! request/notification router built on top of it, and optimistic-concurrency
//! writes to a shared store. Components are tick-driven and never block;
//! socket I/O runs on tokio tasks behind the [`socket::Socket`] trait.

pub mod connection;
pub mod error;
pub mod id;
pub mod protocol;
pub mod router;
pub mod session;
pub mod socket;
pub mod store;

#[cfg(test)]
mod test_helpers;

pub use connection::{Connection, ConnectionConfig, ConnectionEvent, ConnectionState};
pub use error::{Result, SessionError};
pub use id::{MessageId, MessageIdGenerator};
pub use protocol::Frame;
pub use router::{Delivery, Dispatch, Router};
pub use session::{Session, SessionEvent};
pub use socket::{Socket, SocketError, SocketEvent, SocketFactory, WebSocketFactory, WebSocketSocket};
pub use store::{
    OptimisticWriter, PendingWrite, SharedStore, StoreError, Versioned, WriteError, WriterConfig,
};
