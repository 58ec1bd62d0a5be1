// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use tether_session::SessionEvent;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

use super::open_session;

pub async fn run(url: &str, count: Option<usize>, config: &Config) -> Result<()> {
    let (session, mut events) = open_session(url, &config.connection).await?;
    info!("listening on {}", url);

    let mut out = std::io::stdout();
    let result = tokio::select! {
        result = print_notifications(&mut events, count, &mut out) => result.map(|_| ()),
        _ = tokio::signal::ctrl_c() => Ok(()),
    };

    session.disconnect().await;
    result
}

/// Prints each notification as a JSON line until `count` have been seen or
/// the session closes. Returns how many were printed.
pub async fn print_notifications<W: Write>(
    events: &mut UnboundedReceiver<SessionEvent>,
    count: Option<usize>,
    out: &mut W,
) -> Result<usize> {
    let mut seen = 0usize;

    while count.is_none_or(|n| seen < n) {
        let Some(event) = events.recv().await else {
            break;
        };
        match event {
            SessionEvent::Notification(frame) => {
                writeln!(out, "{}", frame.to_json()?)?;
                out.flush()?;
                seen += 1;
            }
            SessionEvent::Connected => info!("reconnected"),
            SessionEvent::Disconnected { code, reason } => {
                warn!("connection lost ({}): {}; reconnecting", code, reason)
            }
            SessionEvent::ParseError(error) => warn!("skipping malformed frame: {}", error),
            SessionEvent::ConnectError(error) => return Err(Error::Connection(error)),
            SessionEvent::Closed {
                was_clean: true, ..
            } => break,
            SessionEvent::Closed { code, reason, .. } => {
                return Err(Error::Connection(format!("closed ({}): {}", code, reason)))
            }
        }
    }
    Ok(seen)
}

#[cfg(test)]
#[path = "listen_tests.rs"]
mod tests;
