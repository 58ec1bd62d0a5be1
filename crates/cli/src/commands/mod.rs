// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

pub mod batch;
pub mod config;
pub mod fetch;
pub mod listen;
pub mod write;

use std::time::Duration;

use tether_session::ConnectionConfig;

use crate::driver::{wait_connected, SessionHandle};
use crate::error::Result;

/// Timeout for establishing a connection to a remote host.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by the request commands.
pub fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("tether/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(CONNECT_TIMEOUT)
        .build()?;
    Ok(client)
}

/// Opens a session to `url` and waits until it is connected.
pub async fn open_session(
    url: &str,
    config: &ConnectionConfig,
) -> Result<(
    SessionHandle,
    tokio::sync::mpsc::UnboundedReceiver<tether_session::SessionEvent>,
)> {
    let (session, mut events) = SessionHandle::start(url, config.clone());
    wait_connected(&mut events).await?;
    Ok((session, events))
}
