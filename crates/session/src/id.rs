// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Message id generation.
//!
//! Ids have the form `{prefix}{n}` with `n` starting at 1 and increasing by
//! one per frame. The counter survives reconnects, so an id is never reused
//! within one connection object.

/// Correlation id of an outbound frame.
pub type MessageId = String;

/// Default id prefix.
pub const DEFAULT_PREFIX: &str = "tether-";

/// Monotonic message id generator.
#[derive(Debug, Clone)]
pub struct MessageIdGenerator {
    prefix: String,
    last: u64,
}

impl MessageIdGenerator {
    /// Creates a generator with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        MessageIdGenerator {
            prefix: prefix.into(),
            last: 0,
        }
    }

    /// Returns the next id.
    pub fn next_id(&mut self) -> MessageId {
        self.last += 1;
        format!("{}{}", self.prefix, self.last)
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.last
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
