// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Tests for the RITE format definitions.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::container::{self, CatchHandler};
use crate::insn::Fetch;
use crate::op;

// --- Instruction fetch tests ---

#[test]
fn fetch_byte_operands() {
    let code = [op::MOVE, 3, 7];
    let mut f = Fetch::new(&code, 0);
    assert_eq!(f.b(), op::MOVE);
    assert_eq!(f.b(), 3);
    assert_eq!(f.b(), 7);
    assert!(f.at_end());
}

#[test]
fn fetch_short_is_big_endian() {
    let code = [op::JMP, 0x01, 0x02];
    let mut f = Fetch::new(&code, 0);
    assert_eq!(f.b(), op::JMP);
    assert_eq!(f.s(), 0x0102);
}

#[test]
fn fetch_word_is_big_endian() {
    let code = [op::ENTER, 0x01, 0x02, 0x03];
    let mut f = Fetch::new(&code, 0);
    assert_eq!(f.b(), op::ENTER);
    assert_eq!(f.w(), 0x0001_0203);
}

#[test]
fn fetch_past_end_reads_zero() {
    let code = [op::RETURN];
    let mut f = Fetch::new(&code, 0);
    assert_eq!(f.b(), op::RETURN);
    assert_eq!(f.b(), 0);
    assert_eq!(f.s(), 0);
}

#[test]
fn fetch_ss_builds_32_bits() {
    let code = [0x12, 0x34, 0x56, 0x78];
    let mut f = Fetch::new(&code, 0);
    assert_eq!(f.ss(), 0x1234_5678);
}

// --- Envelope reader tests ---

#[test]
fn be_readers_match_manual_decode() {
    let bytes = [0xde, 0xad, 0xbe, 0xef, 0x01, 0x02, 0x03, 0x04];
    assert_eq!(container::u16_be(&bytes, 0), Some(0xdead));
    assert_eq!(container::u32_be(&bytes, 0), Some(0xdead_beef));
    assert_eq!(container::u64_be(&bytes, 0), Some(0xdead_beef_0102_0304));
}

#[test]
fn be_readers_reject_truncation() {
    let bytes = [0xff];
    assert_eq!(container::u16_be(&bytes, 0), None);
    assert_eq!(container::u32_be(&bytes, 0), None);
    assert_eq!(container::u16_be(&bytes, 1), None);
}

// --- Catch handler tests ---

#[test]
fn catch_handler_parses_13_byte_record() {
    let mut rec = [0u8; 13];
    rec[0] = container::catch_type::RESCUE;
    rec[1..5].copy_from_slice(&10u32.to_be_bytes());
    rec[5..9].copy_from_slice(&20u32.to_be_bytes());
    rec[9..13].copy_from_slice(&30u32.to_be_bytes());

    let h = CatchHandler::parse(&rec, 0).unwrap();
    assert_eq!(h.kind, container::catch_type::RESCUE);
    assert_eq!(h.begin, 10);
    assert_eq!(h.end, 20);
    assert_eq!(h.target, 30);
}

#[test]
fn catch_handler_covers_is_half_open() {
    let h = CatchHandler {
        kind: 0,
        begin: 10,
        end: 20,
        target: 30,
    };
    assert!(!h.covers(9));
    assert!(h.covers(10));
    assert!(h.covers(19));
    assert!(!h.covers(20));
}

#[test]
fn catch_handler_rejects_short_record() {
    let rec = [0u8; 12];
    assert!(CatchHandler::parse(&rec, 0).is_none());
}

// --- Enter aspec tests ---

#[test]
fn aspec_unpacks_fields() {
    // 2 required, 1 optional, rest flag set.
    let w = (2u32 << 18) | (1 << 13) | (1 << 12);
    assert_eq!(op::aspec::required(w), 2);
    assert_eq!(op::aspec::optional(w), 1);
    assert!(op::aspec::has_rest(w));
}

#[test]
fn aspec_zero_word_means_no_args() {
    assert_eq!(op::aspec::required(0), 0);
    assert_eq!(op::aspec::optional(0), 0);
    assert!(!op::aspec::has_rest(0));
}
