// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! A connection paired with a router.
//!
//! The session turns raw connection events into [`SessionEvent`]s, routes
//! inbound frames, and fails every pending request when the connection drops.
//! Each request callback fires exactly once: with the response, with a remote
//! error, or with the reason the request could not complete.

use std::time::Instant;

use serde_json::Value;
use tracing::{info, warn};

use crate::connection::{Connection, ConnectionEvent, ConnectionState};
use crate::error::{Result, SessionError};
use crate::id::MessageId;
use crate::protocol::{Frame, DISCONNECT_NOTIF};
use crate::router::{Delivery, Dispatch, Router};

/// Events surfaced by [`Session::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The connection is open.
    Connected,
    /// Connecting failed for good.
    ConnectError(String),
    /// The connection was lost and is being re-established.
    Disconnected { code: u16, reason: String },
    /// The connection closed for good.
    Closed {
        code: u16,
        reason: String,
        was_clean: bool,
    },
    /// An inbound frame could not be parsed. The connection stays up.
    ParseError(String),
    /// A frame with no pending request and no registered listener.
    Notification(Frame),
}

/// Connection plus request/notification routing.
pub struct Session {
    connection: Connection,
    router: Router,
    deferred: Vec<Delivery>,
    deadlines: Vec<(Instant, MessageId)>,
}

impl Session {
    pub fn new(connection: Connection) -> Self {
        Session {
            connection,
            router: Router::new(),
            deferred: Vec::new(),
            deadlines: Vec::new(),
        }
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// The underlying connection, mutably (e.g. to change its config).
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    pub fn connect(&mut self, now: Instant) {
        self.connection.connect(now);
    }

    pub fn disconnect(&mut self) {
        self.connection.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Number of requests waiting for a response.
    pub fn pending(&self) -> usize {
        self.router.pending()
    }

    /// Sends a request and waits for its response.
    ///
    /// Returns the request id, or `None` if the request could not be sent.
    /// In that case the callback receives the error on the next tick. A
    /// request still unanswered when the response timeout has passed since
    /// `now` fails with [`SessionError::Timeout`].
    pub fn request<F>(
        &mut self,
        kind: &str,
        payload: Value,
        callback: F,
        now: Instant,
    ) -> Option<MessageId>
    where
        F: FnOnce(Result<Frame>) + Send + 'static,
    {
        match self.connection.send_raw(kind, payload) {
            Ok(id) => {
                self.router.expect(kind, id.clone(), callback);
                if let Some(timeout) = self.connection.config().response_timeout() {
                    self.deadlines.push((now + timeout, id.clone()));
                }
                Some(id)
            }
            Err(e) => {
                warn!("cannot send {}: {}", kind, e);
                self.deferred.push(Delivery::new(Box::new(callback), Err(e)));
                None
            }
        }
    }

    /// Registers a listener for notifications of type `kind`.
    pub fn listen<F>(&mut self, kind: impl Into<String>, handler: F)
    where
        F: FnMut(&Frame) + Send + 'static,
    {
        self.router.listen(kind, handler);
    }

    /// Advances the connection and routes inbound frames.
    ///
    /// Response callbacks and notification listeners are returned rather
    /// than fired.
    pub fn poll(&mut self, now: Instant) -> (Vec<SessionEvent>, Vec<Delivery>) {
        let mut deliveries = std::mem::take(&mut self.deferred);
        let mut events = Vec::new();

        for event in self.connection.tick(now) {
            match event {
                ConnectionEvent::Frame(text) => match self.router.dispatch(&text) {
                    Ok(Dispatch::Response(delivery)) => deliveries.push(delivery),
                    Ok(Dispatch::Notification(delivery)) => deliveries.push(delivery),
                    Ok(Dispatch::Unhandled(frame)) => {
                        if frame.kind == DISCONNECT_NOTIF {
                            info!("server is closing the connection: {}", frame.error_message());
                        }
                        events.push(SessionEvent::Notification(frame));
                    }
                    Err(e) => {
                        warn!("dropping frame: {}", e);
                        events.push(SessionEvent::ParseError(e.to_string()));
                    }
                },
                ConnectionEvent::Connected => events.push(SessionEvent::Connected),
                ConnectionEvent::ConnectError(error) => {
                    deliveries.extend(self.fail_pending());
                    events.push(SessionEvent::ConnectError(error));
                }
                ConnectionEvent::Disconnected { code, reason } => {
                    deliveries.extend(self.fail_pending());
                    events.push(SessionEvent::Disconnected { code, reason });
                }
                ConnectionEvent::Closed {
                    code,
                    reason,
                    was_clean,
                } => {
                    deliveries.extend(self.fail_pending());
                    events.push(SessionEvent::Closed {
                        code,
                        reason,
                        was_clean,
                    });
                }
            }
        }

        deliveries.extend(self.expire(now));
        (events, deliveries)
    }

    /// Like [`Session::poll`], firing the deliveries before returning.
    pub fn tick(&mut self, now: Instant) -> Vec<SessionEvent> {
        let (events, deliveries) = self.poll(now);
        for delivery in deliveries {
            delivery.fire();
        }
        events
    }

    fn fail_pending(&mut self) -> Vec<Delivery> {
        self.deadlines.clear();
        self.router.fail_all(&SessionError::Disconnected)
    }

    /// Fails requests whose response timeout has passed.
    fn expire(&mut self, now: Instant) -> Vec<Delivery> {
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.deadlines)
            .into_iter()
            .partition(|(deadline, _)| *deadline <= now);
        self.deadlines = waiting;

        let mut expired = Vec::new();
        for (_, id) in due {
            if let Some(delivery) = self.router.fail(&id, SessionError::Timeout) {
                warn!("request {} timed out", id);
                expired.push(delivery);
            }
        }
        expired
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection", &self.connection)
            .field("router", &self.router)
            .finish()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
