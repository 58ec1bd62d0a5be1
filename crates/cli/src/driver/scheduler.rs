// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry scheduler on a background ticker.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tether_core::{
    Completion, HttpRequest, RequestError, RetryConfig, RetryScheduler, SchedulerError,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use super::lock;

/// A started [`RetryScheduler`] ticked by a tokio task.
///
/// Dropping the handle without [`SchedulerHandle::shutdown`] stops the ticker
/// and discards tracked requests without running their callbacks.
pub struct SchedulerHandle {
    scheduler: Arc<Mutex<RetryScheduler>>,
    cancel_token: CancellationToken,
    ticker: JoinHandle<()>,
    _stop_on_drop: DropGuard,
}

impl SchedulerHandle {
    /// Starts a scheduler and its ticker. Must be called inside a runtime.
    pub fn start(config: RetryConfig) -> Self {
        Self::start_with(RetryScheduler::new(config))
    }

    /// Starts an already constructed scheduler.
    pub fn start_with(mut scheduler: RetryScheduler) -> Self {
        scheduler.startup();
        let scheduler = Arc::new(Mutex::new(scheduler));
        let cancel_token = CancellationToken::new();

        let ticker = tokio::spawn(run_ticker(
            Arc::clone(&scheduler),
            cancel_token.clone(),
        ));

        SchedulerHandle {
            scheduler,
            _stop_on_drop: cancel_token.clone().drop_guard(),
            cancel_token,
            ticker,
        }
    }

    /// Runs `f` with exclusive access to the scheduler.
    ///
    /// Callbacks the scheduler fires from inside `f` must not use this handle.
    pub fn with<R>(&self, f: impl FnOnce(&mut RetryScheduler) -> R) -> R {
        f(&mut lock(&self.scheduler))
    }

    /// Submits a request; `on_complete` fires on the ticker task.
    pub fn submit<F>(&self, request: Arc<dyn HttpRequest>, on_complete: F) -> Result<(), SchedulerError>
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        lock(&self.scheduler).submit(request, on_complete, Instant::now())
    }

    /// Submits a request and waits for its final state.
    ///
    /// Fails with [`RequestError::ShuttingDown`] if the scheduler refused the
    /// request, and with [`RequestError::Cancelled`] if it was discarded by
    /// shutdown while still on the wire.
    pub async fn execute(&self, request: Arc<dyn HttpRequest>) -> tether_core::Result<Completion> {
        let (tx, rx) = oneshot::channel();
        self.submit(request, move |completion| {
            let _ = tx.send(completion);
        })
        .map_err(|_| RequestError::ShuttingDown)?;

        rx.await.map_err(|_| RequestError::Cancelled)
    }

    /// Replaces the scheduler configuration.
    pub fn set_config(&self, config: RetryConfig) {
        lock(&self.scheduler).set_config(config);
    }

    /// Number of tracked requests.
    pub fn len(&self) -> usize {
        lock(&self.scheduler).len()
    }

    /// Whether no requests are tracked.
    pub fn is_empty(&self) -> bool {
        lock(&self.scheduler).is_empty()
    }

    /// Number of requests currently on the wire.
    pub fn in_flight(&self) -> usize {
        lock(&self.scheduler).in_flight()
    }

    /// Stops the ticker and shuts the scheduler down.
    ///
    /// With a flush timeout configured, waits up to that long for tracked
    /// requests to finish first. Requests that already finished get their
    /// callbacks; requests still on the wire are cancelled silently.
    pub async fn shutdown(self) {
        let (flush_timeout, tick) = {
            let scheduler = lock(&self.scheduler);
            (scheduler.config().flush_timeout(), scheduler.config().tick_interval())
        };

        if let Some(timeout) = flush_timeout {
            let waited = tokio::time::timeout(timeout, async {
                while !self.is_empty() {
                    tokio::time::sleep(tick).await;
                }
            })
            .await;
            if waited.is_err() {
                info!("flush timeout elapsed with {} request(s) pending", self.len());
            }
        }

        self.cancel_token.cancel();
        let _ = self.ticker.await;

        let flushed = lock(&self.scheduler).drain_for_shutdown();
        debug!("delivering {} finished request(s) on shutdown", flushed.len());
        for done in flushed {
            done.fire();
        }
    }
}

async fn run_ticker(scheduler: Arc<Mutex<RetryScheduler>>, cancel_token: CancellationToken) {
    loop {
        let period: Duration = lock(&scheduler).config().tick_interval();
        tokio::select! {
            _ = cancel_token.cancelled() => return,
            _ = tokio::time::sleep(period) => {
                let finished = lock(&scheduler).poll(Instant::now());
                for done in finished {
                    done.fire();
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
