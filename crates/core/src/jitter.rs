// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Jitter sources for backoff delays.
//!
//! Backoff computations draw their randomness through [`JitterSource`] so the
//! draw can be replaced with a deterministic one in tests.

use rand::Rng;

/// Source of symmetric jitter values.
pub trait JitterSource: Send {
    /// Returns a value in `[-bound, +bound]`.
    ///
    /// `bound` is never negative.
    fn sample(&mut self, bound: f64) -> f64;
}

/// Uniformly distributed jitter backed by the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn sample(&mut self, bound: f64) -> f64 {
        if bound <= 0.0 {
            return 0.0;
        }
        rand::rng().random_range(-bound..=bound)
    }
}

/// Jitter that always returns the same fraction of the bound.
///
/// `FixedJitter(0.0)` disables jitter, `FixedJitter(1.0)` always picks the
/// upper edge and `FixedJitter(-1.0)` the lower edge.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl JitterSource for FixedJitter {
    fn sample(&mut self, bound: f64) -> f64 {
        bound * self.0.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
#[path = "jitter_tests.rs"]
mod tests;
