// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-process WebSocket store server for tests.
//!
//! Speaks the session frame protocol: answers store reads and writes with
//! version checks, echoes `echoRequest`, and can be told to let another
//! writer slip in before ours.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tether_session::protocol::{
    response_type, CONFLICT_CODE, PING, STORE_READ_REQUEST, STORE_WRITE_REQUEST,
};
use tether_session::{Frame, Versioned};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

/// Frame kind that makes the server send a `messageNotif` with the payload.
pub const NOTIFY_REQUEST: &str = "notifyRequest";
/// Frame kind that is answered with the same payload.
pub const ECHO_REQUEST: &str = "echoRequest";

#[derive(Default)]
pub struct ServerState {
    pub values: HashMap<String, Versioned>,
    /// Writes that will find the version bumped by someone else.
    pub interlopers: u32,
    pub writes: u32,
    pub connections: u32,
}

pub struct TestServer {
    addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(ServerState::default()));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let accept_state = Arc::clone(&state);
        tokio::spawn(async move {
            tokio::select! {
                _ = accept_loop(listener, accept_state) => {}
                _ = shutdown_rx => {}
            }
        });

        TestServer {
            addr,
            state,
            _shutdown_tx: shutdown_tx,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn seed(&self, resource: &str, value: Value) {
        self.state().values.insert(
            resource.to_string(),
            Versioned {
                value,
                updated_at: 1,
            },
        );
    }

    pub fn value(&self, resource: &str) -> Option<Versioned> {
        self.state().values.get(resource).cloned()
    }

    pub fn interfere(&self, times: u32) {
        self.state().interlopers = times;
    }

    pub fn writes(&self) -> u32 {
        self.state().writes
    }

    pub fn connections(&self) -> u32 {
        self.state().connections
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ServerState> {
        self.state.lock().unwrap()
    }
}

async fn accept_loop(listener: TcpListener, state: Arc<Mutex<ServerState>>) {
    while let Ok((stream, _)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };
            state.lock().unwrap().connections += 1;

            while let Some(Ok(message)) = ws.next().await {
                let Message::Text(text) = message else {
                    continue;
                };
                let Ok(frame) = Frame::from_json(text.as_str()) else {
                    continue;
                };
                for reply in handle(&frame, &state) {
                    if ws.send(Message::text(reply.to_json().unwrap())).await.is_err() {
                        return;
                    }
                }
            }
        });
    }
}

fn handle(frame: &Frame, state: &Mutex<ServerState>) -> Vec<Frame> {
    let id = frame.id.clone().unwrap_or_default();
    let reply = |payload: Value, code: i32| {
        Frame::new(response_type(&frame.kind), payload)
            .with_id(id.clone())
            .with_code(code)
    };
    let resource = frame.payload["resource"].as_str().unwrap_or_default().to_string();
    let mut state = state.lock().unwrap();

    match frame.kind.as_str() {
        PING => Vec::new(),
        ECHO_REQUEST => vec![reply(frame.payload.clone(), 0)],
        NOTIFY_REQUEST => vec![
            Frame::new("messageNotif", frame.payload.clone()),
            reply(Value::Null, 0),
        ],
        STORE_READ_REQUEST => match state.values.get(&resource) {
            Some(stored) => vec![reply(serde_json::to_value(stored).unwrap(), 0)],
            None => vec![reply(json!({"message": "no such resource"}), 404)],
        },
        STORE_WRITE_REQUEST => {
            state.writes += 1;
            let expected = frame.payload["updatedAt"].as_i64().unwrap_or(-1);
            let value = frame.payload["value"].clone();
            let interfere = state.interlopers > 0;
            if interfere {
                state.interlopers -= 1;
            }

            let stored = state.values.entry(resource).or_insert(Versioned {
                value: Value::Null,
                updated_at: 0,
            });
            if interfere {
                stored.updated_at += 1;
            }
            if stored.updated_at != expected {
                return vec![reply(json!({"message": "stale version"}), CONFLICT_CODE)];
            }
            stored.value = value;
            stored.updated_at += 1;
            vec![reply(serde_json::to_value(&*stored).unwrap(), 0)]
        }
        other => vec![reply(json!({"message": format!("unknown request {}", other)}), 400)],
    }
}
