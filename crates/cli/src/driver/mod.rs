// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background tick drivers.
//!
//! The retry scheduler and the session are synchronous state machines that
//! must be ticked. The handles in this module own one of them behind a mutex
//! and tick it from a tokio task until cancelled. Callbacks are always fired
//! after the lock is released, so they may call back into the handle.

pub mod scheduler;
pub mod session;

pub use scheduler::SchedulerHandle;
pub use session::{wait_connected, SessionHandle};

use std::sync::{Mutex, MutexGuard};

/// Locks `mutex`, recovering the data if a callback panicked while holding it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
