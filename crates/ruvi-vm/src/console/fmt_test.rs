// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Tests for the printf engine.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::fmt::{FmtError, Piece, Sink, Spec, Template, flags, format_float, format_int, format_str};
use proptest::prelude::*;
use std::string::String;
use std::vec::Vec;

impl Sink for Vec<u8> {
    fn push(&mut self, byte: u8) {
        Vec::push(self, byte);
    }
}

fn spec(conv: u8) -> Spec {
    Spec {
        flags: 0,
        width: 0,
        prec: None,
        conv,
    }
}

fn fmt_i(s: Spec, v: i64) -> String {
    let mut out = Vec::new();
    format_int(&mut out, &s, v);
    String::from_utf8(out).unwrap()
}

fn fmt_f(s: Spec, v: f64) -> String {
    let mut out = Vec::new();
    format_float(&mut out, &s, v);
    String::from_utf8(out).unwrap()
}

// --- Template parsing ---

#[test]
fn literal_runs_pass_through() {
    let mut t = Template::new(b"hello world");
    assert_eq!(t.next_piece().unwrap().unwrap(), Piece::Lit(b"hello world"));
    assert!(t.next_piece().is_none());
}

#[test]
fn percent_percent_is_literal() {
    let mut t = Template::new(b"100%%");
    assert_eq!(t.next_piece().unwrap().unwrap(), Piece::Lit(b"100"));
    assert_eq!(t.next_piece().unwrap().unwrap(), Piece::Lit(b"%"));
}

#[test]
fn spec_with_flags_width_precision() {
    let mut t = Template::new(b"%-08.3f");
    let Piece::Spec(s) = t.next_piece().unwrap().unwrap() else {
        panic!("expected spec");
    };
    assert_eq!(s.flags, flags::MINUS | flags::ZERO);
    assert_eq!(s.width, 8);
    assert_eq!(s.prec, Some(3));
    assert_eq!(s.conv, b'f');
}

#[test]
fn trailing_percent_is_an_error() {
    let mut t = Template::new(b"abc%");
    assert_eq!(t.next_piece().unwrap().unwrap(), Piece::Lit(b"abc"));
    assert_eq!(t.next_piece().unwrap(), Err(FmtError::Truncated));
}

#[test]
fn unknown_conversion_is_an_error() {
    let mut t = Template::new(b"%q");
    assert_eq!(t.next_piece().unwrap(), Err(FmtError::BadConversion(b'q')));
}

// --- Integer formatting ---

#[test]
fn decimal_basics() {
    assert_eq!(fmt_i(spec(b'd'), 0), "0");
    assert_eq!(fmt_i(spec(b'd'), 42), "42");
    assert_eq!(fmt_i(spec(b'd'), -42), "-42");
    assert_eq!(fmt_i(spec(b'd'), i64::MIN), "-9223372036854775808");
}

#[test]
fn width_pads_left_by_default() {
    let mut s = spec(b'd');
    s.width = 5;
    assert_eq!(fmt_i(s, 42), "   42");
}

#[test]
fn zero_flag_pads_after_sign() {
    let mut s = spec(b'd');
    s.width = 5;
    s.flags = flags::ZERO;
    assert_eq!(fmt_i(s, -42), "-0042");
}

#[test]
fn minus_flag_left_adjusts() {
    let mut s = spec(b'd');
    s.width = 5;
    s.flags = flags::MINUS;
    assert_eq!(fmt_i(s, 42), "42   ");
}

#[test]
fn plus_flag_forces_sign() {
    let mut s = spec(b'd');
    s.flags = flags::PLUS;
    assert_eq!(fmt_i(s, 42), "+42");
}

#[test]
fn hex_and_binary() {
    assert_eq!(fmt_i(spec(b'x'), 255), "ff");
    assert_eq!(fmt_i(spec(b'X'), 255), "FF");
    assert_eq!(fmt_i(spec(b'o'), 8), "10");
    assert_eq!(fmt_i(spec(b'b'), 5), "101");
}

#[test]
fn alt_flag_prefixes() {
    let mut s = spec(b'x');
    s.flags = flags::ALT;
    assert_eq!(fmt_i(s, 255), "0xff");
    let mut s = spec(b'b');
    s.flags = flags::ALT;
    assert_eq!(fmt_i(s, 5), "0b101");
}

#[test]
fn char_conversion() {
    assert_eq!(fmt_i(spec(b'c'), 65), "A");
}

// --- Float formatting ---

#[test]
fn float_default_precision_is_six() {
    assert_eq!(fmt_f(spec(b'f'), 1.5), "1.500000");
}

#[test]
fn float_explicit_precision() {
    let mut s = spec(b'f');
    s.prec = Some(2);
    assert_eq!(fmt_f(s, 3.14159), "3.14");
}

#[test]
fn float_width_pads() {
    let mut s = spec(b'f');
    s.prec = Some(1);
    s.width = 8;
    assert_eq!(fmt_f(s, 2.5), "     2.5");
}

#[test]
fn float_zero_pad_keeps_sign_first() {
    let mut s = spec(b'f');
    s.prec = Some(1);
    s.width = 8;
    s.flags = flags::ZERO;
    assert_eq!(fmt_f(s, -2.5), "-00002.5");
}

// --- String formatting ---

#[test]
fn string_width_and_precision() {
    let mut out = Vec::new();
    let mut s = spec(b's');
    s.width = 6;
    format_str(&mut out, &s, b"abc");
    assert_eq!(out, b"   abc");

    let mut out = Vec::new();
    let mut s = spec(b's');
    s.prec = Some(2);
    format_str(&mut out, &s, b"abc");
    assert_eq!(out, b"ab");
}

// --- Properties ---

proptest! {
    /// %d then parse back yields the original value.
    #[test]
    fn decimal_round_trips(v in any::<i64>()) {
        let text = fmt_i(spec(b'd'), v);
        prop_assert_eq!(text.parse::<i64>().unwrap(), v);
    }

    /// %f with high precision then parse back is within ieee tolerance.
    #[test]
    fn float_round_trips(v in -1.0e12f64..1.0e12) {
        let mut s = spec(b'f');
        s.prec = Some(17);
        let text = fmt_f(s, v);
        let back = text.parse::<f64>().unwrap();
        prop_assert!((back - v).abs() <= v.abs() * 1e-12 + 1e-9);
    }
}
