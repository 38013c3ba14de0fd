// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Tests for the console abstraction.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{Console, MockConsole};

#[test]
fn mock_captures_bytes() {
    let mut con = MockConsole::new();
    con.put(b'h');
    con.put(b'i');
    assert_eq!(con.output(), b"hi");
}

#[test]
fn write_str_uses_put() {
    let mut con = MockConsole::new();
    con.write_str("ruvi\n");
    assert_eq!(con.output_string(), "ruvi\n");
}

#[test]
fn clear_resets_output() {
    let mut con = MockConsole::new();
    con.write_str("x");
    con.clear();
    assert!(con.output().is_empty());
}
