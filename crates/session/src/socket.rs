// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Socket abstraction for the connection state machine.
//!
//! A [`Socket`] never blocks: `connect`, `send` and `close` only queue work
//! for a background task, and results come back as [`SocketEvent`]s drained
//! with [`Socket::poll_event`] during the owner's tick. This keeps the state
//! machine synchronous and lets tests drive it with a scripted socket.

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

/// Close code for a normal, client-requested close.
pub const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the connection dropped without a close frame.
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Error type for socket operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocketError {
    /// The socket is not open.
    #[error("socket is not open")]
    NotOpen,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Something that happened on a socket since the last poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    /// The handshake completed.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The connection attempt failed.
    Error(String),
    /// The socket closed.
    Closed {
        code: u16,
        reason: String,
        was_clean: bool,
    },
}

/// Non-blocking message socket.
pub trait Socket: Send {
    /// Starts connecting. Completion is reported as an event.
    fn connect(&mut self);

    /// Queues a text frame.
    fn send(&mut self, text: String) -> Result<(), SocketError>;

    /// Starts a graceful close.
    fn close(&mut self, code: u16, reason: &str);

    /// Next pending event, if any.
    fn poll_event(&mut self) -> Option<SocketEvent>;
}

/// Creates a fresh socket for every connection attempt.
pub trait SocketFactory: Send {
    /// Creates an unconnected socket.
    fn create(&self) -> Box<dyn Socket>;
}

enum Command {
    Text(String),
    Close { code: u16, reason: String },
}

/// WebSocket implementation using tokio-tungstenite.
///
/// I/O runs on a task spawned on the given runtime.
pub struct WebSocketSocket {
    url: String,
    runtime: Handle,
    commands: Option<mpsc::UnboundedSender<Command>>,
    events_tx: mpsc::UnboundedSender<SocketEvent>,
    events: mpsc::UnboundedReceiver<SocketEvent>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketSocket {
    /// Create a socket for `url` whose I/O runs on `runtime`.
    pub fn new(url: impl Into<String>, runtime: Handle) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        WebSocketSocket {
            url: url.into(),
            runtime,
            commands: None,
            events_tx,
            events,
            task: None,
        }
    }
}

impl Socket for WebSocketSocket {
    fn connect(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let (commands_tx, commands) = mpsc::unbounded_channel();
        self.commands = Some(commands_tx);
        self.task = Some(self.runtime.spawn(run_socket(
            self.url.clone(),
            commands,
            self.events_tx.clone(),
        )));
    }

    fn send(&mut self, text: String) -> Result<(), SocketError> {
        let commands = self.commands.as_ref().ok_or(SocketError::NotOpen)?;
        commands
            .send(Command::Text(text))
            .map_err(|_| SocketError::NotOpen)
    }

    fn close(&mut self, code: u16, reason: &str) {
        if let Some(commands) = &self.commands {
            let _ = commands.send(Command::Close {
                code,
                reason: reason.to_string(),
            });
        }
    }

    fn poll_event(&mut self) -> Option<SocketEvent> {
        self.events.try_recv().ok()
    }
}

impl Drop for WebSocketSocket {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Creates [`WebSocketSocket`]s for one url.
pub struct WebSocketFactory {
    url: String,
    runtime: Handle,
}

impl WebSocketFactory {
    /// Create a factory for `url`, spawning socket tasks on `runtime`.
    pub fn new(url: impl Into<String>, runtime: Handle) -> Self {
        WebSocketFactory {
            url: url.into(),
            runtime,
        }
    }
}

impl SocketFactory for WebSocketFactory {
    fn create(&self) -> Box<dyn Socket> {
        Box::new(WebSocketSocket::new(self.url.clone(), self.runtime.clone()))
    }
}

fn closed(code: u16, reason: impl Into<String>, was_clean: bool) -> SocketEvent {
    SocketEvent::Closed {
        code,
        reason: reason.into(),
        was_clean,
    }
}

async fn run_socket(
    url: String,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<SocketEvent>,
) {
    let ws_stream = match tokio_tungstenite::connect_async(&url).await {
        Ok((ws_stream, _)) => ws_stream,
        Err(e) => {
            let _ = events.send(SocketEvent::Error(e.to_string()));
            return;
        }
    };
    let _ = events.send(SocketEvent::Opened);
    debug!("websocket open: {}", url);

    let (mut sink, mut stream) = ws_stream.split();
    let mut commands_open = true;

    loop {
        tokio::select! {
            command = commands.recv(), if commands_open => match command {
                Some(Command::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        let _ = events.send(closed(CLOSE_ABNORMAL, e.to_string(), false));
                        return;
                    }
                }
                Some(Command::Close { code, reason }) => {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: reason.into(),
                    };
                    // Keep reading until the peer echoes the close.
                    if sink.send(Message::Close(Some(frame))).await.is_err() {
                        let _ = events.send(closed(code, "close handshake failed", false));
                        return;
                    }
                }
                None => {
                    commands_open = false;
                    let _ = sink.close().await;
                }
            },
            message = stream.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(SocketEvent::Message(text.as_str().to_string()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
                        .unwrap_or((1005, String::new()));
                    let _ = events.send(closed(code, reason, true));
                    return;
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    let _ = events.send(closed(CLOSE_ABNORMAL, e.to_string(), false));
                    return;
                }
                None => {
                    let _ = events.send(closed(CLOSE_ABNORMAL, "stream ended", false));
                    return;
                }
            },
        }
    }
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
