// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ids_increase_from_one() {
    let mut ids = MessageIdGenerator::new("m");
    assert_eq!(ids.next_id(), "m1");
    assert_eq!(ids.next_id(), "m2");
    assert_eq!(ids.next_id(), "m3");
    assert_eq!(ids.issued(), 3);
}

#[test]
fn default_prefix() {
    let mut ids = MessageIdGenerator::default();
    assert_eq!(ids.next_id(), "tether-1");
}

#[test]
fn ids_are_unique() {
    let mut ids = MessageIdGenerator::default();
    let all: std::collections::HashSet<_> = (0..500).map(|_| ids.next_id()).collect();
    assert_eq!(all.len(), 500);
}
