// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Routing of inbound frames to response waiters and notification listeners.
//!
//! A request registers a one-shot waiter under its response type. An inbound
//! frame goes to:
//!
//! 1. the waiter whose id it echoes, or the oldest waiter of its type when
//!    the frame carries no id;
//! 2. otherwise every listener registered for its type;
//! 3. otherwise back to the caller as unhandled.
//!
//! Neither waiters nor listeners run in place. Both come back as
//! [`Delivery`] values, so the owner can fire them after releasing its own
//! locks.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::{Result, SessionError};
use crate::id::MessageId;
use crate::protocol::{response_type, Frame};

/// Callback for the response to one request.
pub type ResponseCallback = Box<dyn FnOnce(Result<Frame>) + Send>;

/// Handler for notifications of one type.
pub type NotificationHandler = Box<dyn FnMut(&Frame) + Send>;

type SharedHandler = Arc<Mutex<NotificationHandler>>;

enum Pending {
    Response {
        callback: ResponseCallback,
        result: Result<Frame>,
    },
    Notification {
        handlers: Vec<SharedHandler>,
        frame: Frame,
    },
}

/// Work produced by routing: a response outcome for its waiting callback,
/// or a notification for the listeners of its type.
pub struct Delivery(Pending);

impl Delivery {
    /// Pairs a response callback with its outcome.
    pub fn new(callback: ResponseCallback, result: Result<Frame>) -> Self {
        Delivery(Pending::Response { callback, result })
    }

    fn notification(handlers: Vec<SharedHandler>, frame: Frame) -> Self {
        Delivery(Pending::Notification { handlers, frame })
    }

    /// The outcome a response callback will receive. `None` for
    /// notifications.
    pub fn result(&self) -> Option<&Result<Frame>> {
        match &self.0 {
            Pending::Response { result, .. } => Some(result),
            Pending::Notification { .. } => None,
        }
    }

    /// The notification frame. `None` for responses.
    pub fn frame(&self) -> Option<&Frame> {
        match &self.0 {
            Pending::Response { .. } => None,
            Pending::Notification { frame, .. } => Some(frame),
        }
    }

    /// Runs the response callback, or every listener in registration order.
    pub fn fire(self) {
        match self.0 {
            Pending::Response { callback, result } => callback(result),
            Pending::Notification { handlers, frame } => {
                for handler in handlers {
                    let mut guard = handler.lock().unwrap_or_else(|e| e.into_inner());
                    let handler: &mut NotificationHandler = &mut guard;
                    handler(&frame);
                }
            }
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Pending::Response { result, .. } => f.debug_tuple("Response").field(result).finish(),
            Pending::Notification { handlers, frame } => f
                .debug_struct("Notification")
                .field("kind", &frame.kind)
                .field("listeners", &handlers.len())
                .finish(),
        }
    }
}

/// What happened to a dispatched frame.
#[derive(Debug)]
pub enum Dispatch {
    /// The frame answered a pending request.
    Response(Delivery),
    /// The frame is for registered listeners.
    Notification(Delivery),
    /// Nobody was interested in the frame.
    Unhandled(Frame),
}

struct Waiter {
    id: MessageId,
    callback: ResponseCallback,
}

/// Correlates responses with requests and fans out notifications.
#[derive(Default)]
pub struct Router {
    waiters: HashMap<String, VecDeque<Waiter>>,
    listeners: HashMap<String, Vec<SharedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the response to request `id` of type `request_kind`.
    pub fn expect<F>(&mut self, request_kind: &str, id: MessageId, callback: F)
    where
        F: FnOnce(Result<Frame>) + Send + 'static,
    {
        self.waiters
            .entry(response_type(request_kind))
            .or_default()
            .push_back(Waiter {
                id,
                callback: Box::new(callback),
            });
    }

    /// Registers a listener for every frame of type `kind`.
    pub fn listen<F>(&mut self, kind: impl Into<String>, handler: F)
    where
        F: FnMut(&Frame) + Send + 'static,
    {
        self.listeners
            .entry(kind.into())
            .or_default()
            .push(Arc::new(Mutex::new(Box::new(handler))));
    }

    /// Number of requests still waiting for a response.
    pub fn pending(&self) -> usize {
        self.waiters.values().map(VecDeque::len).sum()
    }

    /// Routes one inbound text frame.
    ///
    /// Returns a parse error if the text is not a valid frame.
    pub fn dispatch(&mut self, text: &str) -> Result<Dispatch> {
        let frame = Frame::from_json(text)?;

        if let Some(waiter) = self.take_waiter(&frame) {
            debug!("response {} for {}", frame.kind, waiter.id);
            let result = match frame.error_code() {
                Some(code) => Err(SessionError::Remote {
                    code,
                    message: frame.error_message(),
                }),
                None => Ok(frame),
            };
            return Ok(Dispatch::Response(Delivery::new(waiter.callback, result)));
        }

        match self.listeners.get(&frame.kind) {
            Some(handlers) if !handlers.is_empty() => Ok(Dispatch::Notification(
                Delivery::notification(handlers.clone(), frame),
            )),
            _ => Ok(Dispatch::Unhandled(frame)),
        }
    }

    /// Resolves `id` with an error, if it is still pending.
    pub fn fail(&mut self, id: &str, error: SessionError) -> Option<Delivery> {
        for queue in self.waiters.values_mut() {
            if let Some(index) = queue.iter().position(|w| w.id == id) {
                let waiter = queue.remove(index)?;
                return Some(Delivery::new(waiter.callback, Err(error)));
            }
        }
        None
    }

    /// Resolves every pending request with `error`, oldest first per type.
    pub fn fail_all(&mut self, error: &SessionError) -> Vec<Delivery> {
        let failed: Vec<Delivery> = self
            .waiters
            .drain()
            .flat_map(|(_, queue)| queue)
            .map(|waiter| Delivery::new(waiter.callback, Err(error.clone())))
            .collect();
        if !failed.is_empty() {
            debug!("failing {} pending request(s): {}", failed.len(), error);
        }
        failed
    }

    fn take_waiter(&mut self, frame: &Frame) -> Option<Waiter> {
        let queue = self.waiters.get_mut(&frame.kind)?;
        match &frame.id {
            Some(id) => {
                let index = queue.iter().position(|w| &w.id == id)?;
                queue.remove(index)
            }
            None => queue.pop_front(),
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("pending", &self.pending())
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
