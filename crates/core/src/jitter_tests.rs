// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn random_jitter_stays_within_bound() {
    let mut jitter = RandomJitter;
    for _ in 0..1000 {
        let value = jitter.sample(0.5);
        assert!((-0.5..=0.5).contains(&value));
    }
}

#[test]
fn random_jitter_zero_bound() {
    assert_eq!(RandomJitter.sample(0.0), 0.0);
}

#[test]
fn fixed_jitter_clamps_fraction() {
    assert_eq!(FixedJitter(2.0).sample(4.0), 4.0);
    assert_eq!(FixedJitter(-0.5).sample(4.0), -2.0);
}
