// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers: a scripted socket network.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::protocol::Frame;
use crate::socket::{Socket, SocketError, SocketEvent, SocketFactory};

#[derive(Default)]
struct NetworkState {
    sockets: usize,
    connects: usize,
    events: VecDeque<SocketEvent>,
    sent: Vec<String>,
    closes: Vec<(u16, String)>,
}

/// Shared view of every socket a [`MockFactory`] created.
///
/// Events pushed here are delivered to the most recently created socket.
#[derive(Clone, Default)]
pub struct MockNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> Box<dyn SocketFactory> {
        Box::new(MockFactory {
            network: self.clone(),
        })
    }

    pub fn push(&self, event: SocketEvent) {
        self.state.lock().unwrap().events.push_back(event);
    }

    pub fn open(&self) {
        self.push(SocketEvent::Opened);
    }

    pub fn fail(&self, error: &str) {
        self.push(SocketEvent::Error(error.to_string()));
    }

    pub fn drop_connection(&self) {
        self.push(SocketEvent::Closed {
            code: 1006,
            reason: "reset".to_string(),
            was_clean: false,
        });
    }

    pub fn deliver(&self, frame: &Frame) {
        self.push(SocketEvent::Message(frame.to_json().unwrap()));
    }

    pub fn deliver_raw(&self, text: &str) {
        self.push(SocketEvent::Message(text.to_string()));
    }

    /// Number of sockets created so far.
    pub fn sockets(&self) -> usize {
        self.state.lock().unwrap().sockets
    }

    /// Number of connect calls so far.
    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    /// Every frame sent so far, decoded.
    pub fn sent(&self) -> Vec<Frame> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .map(|text| Frame::from_json(text).unwrap())
            .collect()
    }

    /// Frames sent so far, excluding keepalives.
    pub fn sent_requests(&self) -> Vec<Frame> {
        self.sent()
            .into_iter()
            .filter(|frame| frame.kind != crate::protocol::PING)
            .collect()
    }

    pub fn closes(&self) -> Vec<(u16, String)> {
        self.state.lock().unwrap().closes.clone()
    }
}

struct MockFactory {
    network: MockNetwork,
}

impl SocketFactory for MockFactory {
    fn create(&self) -> Box<dyn Socket> {
        let mut state = self.network.state.lock().unwrap();
        state.sockets += 1;
        Box::new(MockSocket {
            network: self.network.clone(),
            index: state.sockets,
            open: false,
        })
    }
}

/// Socket that reads events from its [`MockNetwork`].
///
/// A close request is echoed back as a clean close.
pub struct MockSocket {
    network: MockNetwork,
    index: usize,
    open: bool,
}

impl MockSocket {
    fn is_current(&self, state: &NetworkState) -> bool {
        state.sockets == self.index
    }
}

impl Socket for MockSocket {
    fn connect(&mut self) {
        self.network.state.lock().unwrap().connects += 1;
    }

    fn send(&mut self, text: String) -> Result<(), SocketError> {
        if !self.open {
            return Err(SocketError::NotOpen);
        }
        self.network.state.lock().unwrap().sent.push(text);
        Ok(())
    }

    fn close(&mut self, code: u16, reason: &str) {
        let mut state = self.network.state.lock().unwrap();
        state.closes.push((code, reason.to_string()));
        if self.is_current(&state) {
            state.events.push_back(SocketEvent::Closed {
                code,
                reason: reason.to_string(),
                was_clean: true,
            });
        }
    }

    fn poll_event(&mut self) -> Option<SocketEvent> {
        let mut state = self.network.state.lock().unwrap();
        if !self.is_current(&state) {
            return None;
        }
        let event = state.events.pop_front()?;
        match event {
            SocketEvent::Opened => self.open = true,
            SocketEvent::Closed { .. } | SocketEvent::Error(_) => self.open = false,
            SocketEvent::Message(_) => {}
        }
        Some(event)
    }
}
