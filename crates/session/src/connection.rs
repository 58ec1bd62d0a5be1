// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state machine with automatic reconnection.
//!
//! ```text
//! Closed ──connect──► Connecting ──opened──► Connected
//!                        │   ▲                 │   │
//!                  error │   │ retry due       │   └─disconnect──► Closing ──closed──► Closed
//!                        ▼   │                 │
//!                     Reconnecting ◄──lost─────┘
//!                        │
//!                        └─ reconnect budget spent ──► Closed (ConnectError)
//! ```
//!
//! The machine never blocks. It is driven by [`Connection::tick`], which
//! drains socket events, runs the reconnect and keepalive timers, and returns
//! the lifecycle events produced since the last tick.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_core::backoff::BackoffPolicy;
use tether_core::jitter::{JitterSource, RandomJitter};
use tracing::{debug, info, warn};

use crate::error::{Result, SessionError};
use crate::id::{MessageId, MessageIdGenerator};
use crate::protocol::Frame;
use crate::socket::{Socket, SocketEvent, SocketFactory, CLOSE_ABNORMAL, CLOSE_NORMAL};

fn default_ping_interval_ms() -> u64 {
    30_000
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_reconnect_timeout_ms() -> u64 {
    60_000
}

fn default_reconnect() -> bool {
    true
}

fn default_tick_interval_ms() -> u64 {
    500
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_response_timeout_ms() -> u64 {
    30_000
}

/// Configuration for a [`Connection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Keepalive interval while connected (milliseconds). 0 disables pings.
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
    /// First reconnect delay (milliseconds).
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Maximum reconnect delay (milliseconds).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// How long to keep reconnecting after a loss (milliseconds).
    #[serde(default = "default_reconnect_timeout_ms")]
    pub reconnect_timeout_ms: u64,
    /// Whether to reconnect after an unexpected close.
    #[serde(default = "default_reconnect")]
    pub reconnect: bool,
    /// Silence after a ping that counts as a lost connection (milliseconds).
    /// 0 disables the check.
    #[serde(default)]
    pub pong_timeout_ms: u64,
    /// How long one connect attempt may stay unanswered (milliseconds).
    /// 0 waits for the socket indefinitely.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long a request may wait for its response (milliseconds).
    /// 0 waits until the connection drops.
    #[serde(default = "default_response_timeout_ms")]
    pub response_timeout_ms: u64,
    /// Period of the tick driver (milliseconds).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            ping_interval_ms: default_ping_interval_ms(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            reconnect_timeout_ms: default_reconnect_timeout_ms(),
            reconnect: default_reconnect(),
            pong_timeout_ms: 0,
            connect_timeout_ms: default_connect_timeout_ms(),
            response_timeout_ms: default_response_timeout_ms(),
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

impl ConnectionConfig {
    /// Reconnect backoff described by this configuration.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
            Duration::from_millis(self.reconnect_timeout_ms),
        )
    }

    /// Keepalive interval, if enabled.
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_ms > 0).then(|| Duration::from_millis(self.ping_interval_ms))
    }

    /// Pong timeout, if enabled.
    pub fn pong_timeout(&self) -> Option<Duration> {
        (self.pong_timeout_ms > 0).then(|| Duration::from_millis(self.pong_timeout_ms))
    }

    /// Connect attempt timeout, if enabled.
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_ms > 0).then(|| Duration::from_millis(self.connect_timeout_ms))
    }

    /// Response timeout for requests, if enabled.
    pub fn response_timeout(&self) -> Option<Duration> {
        (self.response_timeout_ms > 0).then(|| Duration::from_millis(self.response_timeout_ms))
    }

    /// Period of the tick driver.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Lifecycle of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Connected,
    Closing,
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closing => "closing",
            ConnectionState::Reconnecting => "reconnecting",
        };
        write!(f, "{}", s)
    }
}

/// Events produced by [`Connection::tick`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The connection is open.
    Connected,
    /// Connecting failed and the reconnect budget is spent.
    ConnectError(String),
    /// The open connection was lost; reconnection has started.
    Disconnected { code: u16, reason: String },
    /// The connection closed and will not be reopened.
    Closed {
        code: u16,
        reason: String,
        was_clean: bool,
    },
    /// A text frame arrived.
    Frame(String),
}

/// Socket connection with reconnection and keepalive.
pub struct Connection {
    config: ConnectionConfig,
    policy: BackoffPolicy,
    jitter: Box<dyn JitterSource>,
    factory: Box<dyn SocketFactory>,
    socket: Option<Box<dyn Socket>>,
    state: ConnectionState,
    ids: MessageIdGenerator,
    pending: Vec<ConnectionEvent>,
    /// Start of the current connect/reconnect window.
    window_start: Instant,
    delay: Option<Duration>,
    next_retry_at: Instant,
    attempt_started: Instant,
    last_ping_at: Instant,
    ping_outstanding_since: Option<Instant>,
}

impl Connection {
    /// Create a closed connection with random reconnect jitter.
    pub fn new(config: ConnectionConfig, factory: Box<dyn SocketFactory>) -> Self {
        Self::with_jitter(config, factory, RandomJitter)
    }

    /// Create a closed connection with a custom jitter source.
    pub fn with_jitter(
        config: ConnectionConfig,
        factory: Box<dyn SocketFactory>,
        jitter: impl JitterSource + 'static,
    ) -> Self {
        let now = Instant::now();
        Connection {
            policy: config.backoff(),
            config,
            jitter: Box::new(jitter),
            factory,
            socket: None,
            state: ConnectionState::Closed,
            ids: MessageIdGenerator::default(),
            pending: Vec::new(),
            window_start: now,
            delay: None,
            next_retry_at: now,
            attempt_started: now,
            last_ping_at: now,
            ping_outstanding_since: None,
        }
    }

    /// Replace the id generator, e.g. to use a different prefix.
    pub fn with_ids(mut self, ids: MessageIdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the connection is open.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Current reconnect delay, if a reconnect has been scheduled.
    pub fn reconnect_delay(&self) -> Option<Duration> {
        self.delay
    }

    /// Current configuration.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Replace the configuration. Timers pick it up on the next tick.
    pub fn set_config(&mut self, config: ConnectionConfig) {
        self.policy = config.backoff();
        self.config = config;
    }

    /// Start connecting. Ignored unless the connection is closed.
    pub fn connect(&mut self, now: Instant) {
        if self.state != ConnectionState::Closed {
            debug!("connect ignored: connection is {}", self.state);
            return;
        }
        self.window_start = now;
        self.delay = None;
        self.open_socket(now);
    }

    /// Close the connection and stop reconnecting.
    pub fn disconnect(&mut self) {
        match self.state {
            ConnectionState::Connected => {
                info!("closing connection");
                self.state = ConnectionState::Closing;
                if let Some(socket) = self.socket.as_mut() {
                    socket.close(CLOSE_NORMAL, "normal closure");
                }
            }
            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                info!("connection attempt abandoned");
                self.socket = None;
                self.finish_closed(CLOSE_NORMAL, "normal closure".to_string(), true);
            }
            ConnectionState::Closing | ConnectionState::Closed => {}
        }
    }

    /// Send a frame of type `kind` with a fresh id. Returns the id.
    pub fn send_raw(&mut self, kind: &str, payload: Value) -> Result<MessageId> {
        if self.state != ConnectionState::Connected {
            return Err(SessionError::NotConnected);
        }
        let id = self.ids.next_id();
        let text = Frame::new(kind, payload).with_id(id.clone()).to_json()?;
        let socket = self.socket.as_mut().ok_or(SessionError::NotConnected)?;
        socket.send(text)?;
        Ok(id)
    }

    /// Drain socket events, run timers and return what happened.
    pub fn tick(&mut self, now: Instant) -> Vec<ConnectionEvent> {
        while let Some(event) = self.socket.as_mut().and_then(|s| s.poll_event()) {
            self.handle_socket_event(event, now);
        }

        match self.state {
            ConnectionState::Reconnecting if now >= self.next_retry_at => {
                debug!("reconnecting (delay {:?})", self.delay);
                self.open_socket(now);
            }
            ConnectionState::Connecting if self.attempt_expired(now) => {
                self.connect_failed("connect timed out".to_string(), now);
            }
            ConnectionState::Connected => self.keepalive(now),
            _ => {}
        }

        std::mem::take(&mut self.pending)
    }

    fn open_socket(&mut self, now: Instant) {
        let mut socket = self.factory.create();
        socket.connect();
        self.socket = Some(socket);
        self.attempt_started = now;
        self.state = ConnectionState::Connecting;
    }

    fn attempt_expired(&self, now: Instant) -> bool {
        self.config
            .connect_timeout()
            .is_some_and(|timeout| now.saturating_duration_since(self.attempt_started) >= timeout)
    }

    fn handle_socket_event(&mut self, event: SocketEvent, now: Instant) {
        match (self.state, event) {
            (ConnectionState::Connecting, SocketEvent::Opened) => {
                info!("connected");
                self.state = ConnectionState::Connected;
                self.delay = None;
                self.last_ping_at = now;
                self.ping_outstanding_since = None;
                self.pending.push(ConnectionEvent::Connected);
            }
            (ConnectionState::Connecting, SocketEvent::Error(error)) => {
                self.connect_failed(error, now);
            }
            (ConnectionState::Connecting, SocketEvent::Closed { reason, .. }) => {
                self.connect_failed(reason, now);
            }
            (ConnectionState::Connected | ConnectionState::Closing, SocketEvent::Message(text)) => {
                self.ping_outstanding_since = None;
                self.pending.push(ConnectionEvent::Frame(text));
            }
            (
                ConnectionState::Connected,
                SocketEvent::Closed {
                    code,
                    reason,
                    was_clean,
                },
            ) => self.connection_lost(code, reason, was_clean, now),
            (ConnectionState::Connected, SocketEvent::Error(error)) => {
                self.connection_lost(CLOSE_ABNORMAL, error, false, now)
            }
            (
                ConnectionState::Closing,
                SocketEvent::Closed {
                    code,
                    reason,
                    was_clean,
                },
            ) => {
                info!("connection closed ({})", code);
                self.socket = None;
                self.finish_closed(code, reason, was_clean);
            }
            (state, event) => debug!("ignoring {:?} while {}", event, state),
        }
    }

    fn connect_failed(&mut self, error: String, now: Instant) {
        self.socket = None;
        if self.config.reconnect && !self.policy.is_exhausted(now, self.window_start) {
            debug!("connect failed: {}", error);
            self.schedule_reconnect(now);
        } else {
            warn!("giving up connecting: {}", error);
            self.state = ConnectionState::Closed;
            self.delay = None;
            self.pending.push(ConnectionEvent::ConnectError(error));
        }
    }

    fn connection_lost(&mut self, code: u16, reason: String, was_clean: bool, now: Instant) {
        self.socket = None;
        if self.config.reconnect {
            warn!("connection lost ({}): {}; reconnecting", code, reason);
            self.window_start = now;
            self.delay = None;
            self.schedule_reconnect(now);
            self.pending
                .push(ConnectionEvent::Disconnected { code, reason });
        } else {
            info!("connection lost ({}): {}", code, reason);
            self.finish_closed(code, reason, was_clean);
        }
    }

    fn schedule_reconnect(&mut self, now: Instant) {
        let delay = self.policy.advance(self.delay, self.jitter.as_mut());
        self.delay = Some(delay);
        self.next_retry_at = self.policy.retry_at(now, self.window_start, delay);
        self.state = ConnectionState::Reconnecting;
    }

    fn finish_closed(&mut self, code: u16, reason: String, was_clean: bool) {
        self.state = ConnectionState::Closed;
        self.delay = None;
        self.pending.push(ConnectionEvent::Closed {
            code,
            reason,
            was_clean,
        });
    }

    fn keepalive(&mut self, now: Instant) {
        if let (Some(timeout), Some(since)) = (self.config.pong_timeout(), self.ping_outstanding_since) {
            if now.saturating_duration_since(since) >= timeout {
                self.connection_lost(CLOSE_ABNORMAL, "ping timeout".to_string(), false, now);
                return;
            }
        }

        let Some(interval) = self.config.ping_interval() else {
            return;
        };
        if now.saturating_duration_since(self.last_ping_at) < interval {
            return;
        }
        self.last_ping_at = now;

        let frame = Frame::ping(self.ids.next_id());
        let sent = match (frame.to_json(), self.socket.as_mut()) {
            (Ok(text), Some(socket)) => socket.send(text).map_err(SessionError::from),
            (Err(e), _) => Err(e),
            (_, None) => Err(SessionError::NotConnected),
        };
        match sent {
            Ok(()) => {
                if self.ping_outstanding_since.is_none() {
                    self.ping_outstanding_since = Some(now);
                }
            }
            Err(e) => warn!("failed to send ping: {}", e),
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("delay", &self.delay)
            .finish()
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
