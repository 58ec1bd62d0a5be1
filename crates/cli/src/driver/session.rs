// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session on a background ticker.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;
use tether_session::{
    Connection, ConnectionConfig, ConnectionState, Frame, MessageId, Session, SessionError,
    SessionEvent, SocketFactory, WebSocketFactory,
};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use super::lock;
use crate::error::{Error, Result};

/// How long [`SessionHandle::disconnect`] waits for the close handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// A [`Session`] ticked by a tokio task.
///
/// Cloning yields another handle to the same session. When the last handle
/// is dropped the ticker stops and the socket is released.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<Session>>,
    cancel_token: CancellationToken,
    _stop_on_drop: Arc<DropGuard>,
}

impl SessionHandle {
    /// Connects to a WebSocket `url` and starts ticking.
    ///
    /// Session events are delivered on the returned receiver.
    pub fn start(
        url: &str,
        config: ConnectionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let factory = WebSocketFactory::new(url, Handle::current());
        Self::start_with(config, Box::new(factory))
    }

    /// Starts a session over sockets created by `factory`.
    pub fn start_with(
        config: ConnectionConfig,
        factory: Box<dyn SocketFactory>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let mut session = Session::new(Connection::new(config, factory));
        session.connect(Instant::now());

        let cancel_token = CancellationToken::new();
        let handle = SessionHandle {
            session: Arc::new(Mutex::new(session)),
            _stop_on_drop: Arc::new(cancel_token.clone().drop_guard()),
            cancel_token,
        };
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_ticker(
            Arc::clone(&handle.session),
            event_tx,
            handle.cancel_token.clone(),
        ));

        (handle, event_rx)
    }

    pub fn state(&self) -> ConnectionState {
        lock(&self.session).state()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.session).is_connected()
    }

    /// Number of requests waiting for a response.
    pub fn pending(&self) -> usize {
        lock(&self.session).pending()
    }

    /// Replaces the connection configuration.
    pub fn set_config(&self, config: ConnectionConfig) {
        lock(&self.session).connection_mut().set_config(config);
    }

    /// Sends a request; `callback` fires on the ticker task.
    pub fn request<F>(&self, kind: &str, payload: Value, callback: F) -> Option<MessageId>
    where
        F: FnOnce(tether_session::Result<Frame>) + Send + 'static,
    {
        lock(&self.session).request(kind, payload, callback, Instant::now())
    }

    /// Sends a request and resolves with its response.
    ///
    /// The request is sent before this returns; the future only waits.
    pub fn call(
        &self,
        kind: &str,
        payload: Value,
    ) -> impl Future<Output = tether_session::Result<Frame>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.request(kind, payload, move |result| {
            let _ = tx.send(result);
        });
        async move { rx.await.unwrap_or(Err(SessionError::Disconnected)) }
    }

    /// Registers a notification listener. It runs on the ticker task after
    /// the session lock is released, so it may use this handle.
    pub fn listen<F>(&self, kind: impl Into<String>, handler: F)
    where
        F: FnMut(&Frame) + Send + 'static,
    {
        lock(&self.session).listen(kind, handler);
    }

    /// Closes the connection and stops the ticker.
    ///
    /// Pending requests fail with [`SessionError::Disconnected`].
    pub async fn disconnect(&self) {
        lock(&self.session).disconnect();

        let closed = tokio::time::timeout(CLOSE_TIMEOUT, async {
            while self.state() != ConnectionState::Closed {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        if closed.is_err() {
            info!("close handshake timed out");
        }

        self.cancel_token.cancel();
        let (_, deliveries) = lock(&self.session).poll(Instant::now());
        for delivery in deliveries {
            delivery.fire();
        }
    }
}

/// Waits for the first connect outcome on `events`.
pub async fn wait_connected(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Result<()> {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Connected => return Ok(()),
            SessionEvent::ConnectError(error) => return Err(Error::Connection(error)),
            SessionEvent::Closed { code, reason, .. } => {
                return Err(Error::Connection(format!("closed ({}): {}", code, reason)))
            }
            other => debug!("before connect: {:?}", other),
        }
    }
    Err(Error::Connection("session stopped".to_string()))
}

async fn run_ticker(
    session: Arc<Mutex<Session>>,
    event_tx: mpsc::UnboundedSender<SessionEvent>,
    cancel_token: CancellationToken,
) {
    loop {
        let period = lock(&session).connection().config().tick_interval();
        tokio::select! {
            _ = cancel_token.cancelled() => return,
            _ = tokio::time::sleep(period) => {
                let (events, deliveries) = lock(&session).poll(Instant::now());
                for delivery in deliveries {
                    delivery.fire();
                }
                for event in events {
                    // The receiver may have been dropped.
                    let _ = event_tx.send(event);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
