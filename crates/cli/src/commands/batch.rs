// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_core::{Batched, EventBatcher, HttpRequest, PreparedRequest, RequestError};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::driver::SchedulerHandle;
use crate::error::{Error, Result};
use crate::transport::ReqwestRequest;

use super::http_client;

/// Kind used for events without a `kind` field.
pub const DEFAULT_KIND: &str = "event";

/// How often the batcher is checked for a due flush.
const FLUSH_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// One JSON event, batched by its `kind` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event(pub Value);

impl Batched for Event {
    fn kind(&self) -> &str {
        self.0
            .get("kind")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_KIND)
    }
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(line)
        .map_err(|e| Error::InvalidArgument(format!("line {}: {}", line_no, e)))?;
    Ok(Some(Event(value)))
}

/// Tally of batch outcomes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub sent: usize,
    pub failed: usize,
    pub first_error: Option<RequestError>,
}

/// Sends every event read from `input` to `url` in batches.
///
/// Events are queued and flushed on the configured interval; immediate
/// kinds go out on their own. Waits for every event's outcome.
pub async fn send_all<R>(input: R, url: &str, config: &Config) -> Result<Summary>
where
    R: AsyncBufRead + Unpin,
{
    let client = http_client()?;
    let runtime = Handle::current();
    let endpoint = url.to_string();
    let mut batcher = EventBatcher::new(config.batch.clone(), move |events: &[Event]| {
        let prepared = PreparedRequest::post(&endpoint)
            .json(&events)
            .map_err(|e| RequestError::Encode(e.to_string()))?;
        let request: Arc<dyn HttpRequest> =
            Arc::new(ReqwestRequest::new(client.clone(), prepared, runtime.clone()));
        Ok(request)
    });
    let scheduler = SchedulerHandle::start(config.retry.clone());
    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<std::result::Result<(), RequestError>>();

    let mut lines = input.lines();
    let mut check = tokio::time::interval(FLUSH_CHECK_INTERVAL);
    let mut line_no = 0usize;
    let read_result: Result<()> = loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break Ok(()),
                    Err(e) => break Err(e.into()),
                };
                line_no += 1;
                let event = match parse_line(line_no, &line) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(e) => break Err(e),
                };
                let ok_tx = outcome_tx.clone();
                let err_tx = outcome_tx.clone();
                scheduler.with(|s| {
                    batcher.send(
                        event,
                        move || {
                            let _ = ok_tx.send(Ok(()));
                        },
                        move |e| {
                            let _ = err_tx.send(Err(e));
                        },
                        s,
                        Instant::now(),
                    )
                });
            }
            _ = check.tick() => {
                scheduler.with(|s| batcher.tick(s, Instant::now()));
            }
        }
    };

    scheduler.with(|s| batcher.shutdown(s, Instant::now()));
    drop(outcome_tx);

    let mut summary = Summary::default();
    while let Some(outcome) = outcome_rx.recv().await {
        match outcome {
            Ok(()) => summary.sent += 1,
            Err(e) => {
                summary.failed += 1;
                summary.first_error.get_or_insert(e);
            }
        }
    }
    scheduler.shutdown().await;

    read_result?;
    Ok(summary)
}

pub async fn run(url: &str, file: &Path, config: &Config) -> Result<()> {
    let summary = if file == Path::new("-") {
        send_all(BufReader::new(tokio::io::stdin()), url, config).await?
    } else {
        let input = tokio::fs::File::open(file).await?;
        send_all(BufReader::new(input), url, config).await?
    };

    info!("{} event(s) sent, {} failed", summary.sent, summary.failed);
    println!("{} sent, {} failed", summary.sent, summary.failed);
    match summary.first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
