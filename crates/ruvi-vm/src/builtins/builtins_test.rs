// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Builtin method tests, driven over assembled images.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::testutil::{IrepBuilder, Lit, run_image};
use ruvi_rite::op;

#[test]
fn puts_with_no_arguments_prints_a_newline() {
    let mut b = IrepBuilder::new(10);
    let puts = b.sym("puts");
    b.op(&[op::SSEND, 1, puts, 0]);
    b.op(&[op::STOP]);
    assert_eq!(run_image(&b.image()).1, "\n");
}

#[test]
fn puts_flattens_arrays_one_per_line() {
    let mut b = IrepBuilder::new(10);
    let puts = b.sym("puts");
    b.op(&[op::LOADI_1, 2]);
    b.op(&[op::LOADI_2, 3]);
    b.op(&[op::ARRAY, 2, 2]);
    b.op(&[op::SSEND, 1, puts, 1]);
    b.op(&[op::STOP]);
    assert_eq!(run_image(&b.image()).1, "1\n2\n");
}

#[test]
fn puts_does_not_double_newlines() {
    let mut b = IrepBuilder::new(10);
    let nl = b.lit(Lit::Str("line\n"));
    let puts = b.sym("puts");
    b.op(&[op::STRING, 2, nl]);
    b.op(&[op::SSEND, 1, puts, 1]);
    b.op(&[op::STOP]);
    assert_eq!(run_image(&b.image()).1, "line\n");
}

#[test]
fn print_emits_no_newline() {
    let mut b = IrepBuilder::new(10);
    let a = b.lit(Lit::Str("a"));
    let print = b.sym("print");
    b.op(&[op::STRING, 2, a]);
    b.op(&[op::SSEND, 1, print, 1]);
    b.op(&[op::STRING, 2, a]);
    b.op(&[op::SSEND, 1, print, 1]);
    b.op(&[op::STOP]);
    assert_eq!(run_image(&b.image()).1, "aa");
}

#[test]
fn printf_formats_mixed_arguments() {
    let mut b = IrepBuilder::new(12);
    let fmt = b.lit(Lit::Str("%s=%05d (%.2f)\n"));
    let name = b.lit(Lit::Str("x"));
    let half = b.lit(Lit::Float(2.5));
    let printf = b.sym("printf");
    b.op(&[op::STRING, 2, fmt]);
    b.op(&[op::STRING, 3, name]);
    b.op(&[op::LOADI, 4, 42]);
    b.op(&[op::LOADL, 5, half]);
    b.op(&[op::SSEND, 1, printf, 4]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(clean, "got: {out}");
    assert_eq!(out, "x=00042 (2.50)\n");
}

#[test]
fn sprintf_returns_a_string() {
    let mut b = IrepBuilder::new(12);
    let fmt = b.lit(Lit::Str("<%d>"));
    let sprintf = b.sym("sprintf");
    let puts = b.sym("puts");
    b.op(&[op::STRING, 2, fmt]);
    b.op(&[op::LOADI, 3, 7]);
    b.op(&[op::SSEND, 1, sprintf, 2]);
    b.op(&[op::MOVE, 2, 1]);
    b.op(&[op::SSEND, 1, puts, 1]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(clean, "got: {out}");
    assert_eq!(out, "<7>\n");
}

#[test]
fn sprintf_round_trips_through_to_i() {
    let mut b = IrepBuilder::new(12);
    let fmt = b.lit(Lit::Str("%d"));
    let sprintf = b.sym("sprintf");
    let to_i = b.sym("to_i");
    let p = b.sym("p");
    let big = b.lit(Lit::Int64(-123_456_789));
    b.op(&[op::STRING, 2, fmt]);
    b.op(&[op::LOADL, 3, big]);
    b.op(&[op::SSEND, 1, sprintf, 2]);
    b.op(&[op::SEND, 1, to_i, 0]);
    b.op(&[op::MOVE, 2, 1]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(clean, "got: {out}");
    assert_eq!(out, "-123456789\n");
}

#[test]
fn too_few_printf_arguments_raise() {
    let mut b = IrepBuilder::new(12);
    let fmt = b.lit(Lit::Str("%d %d"));
    let printf = b.sym("printf");
    b.op(&[op::STRING, 2, fmt]);
    b.op(&[op::LOADI_1, 3]);
    b.op(&[op::SSEND, 1, printf, 2]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(!clean);
    assert!(out.contains("ArgumentError"), "got: {out}");
}

#[test]
fn class_and_kind_of() {
    let mut b = IrepBuilder::new(12);
    let class_sym = b.sym("class");
    let kind_sym = b.sym("kind_of?");
    let int_sym = b.sym("Integer");
    let p = b.sym("p");
    // p 1.class
    b.op(&[op::LOADI_1, 2]);
    b.op(&[op::SEND, 2, class_sym, 0]);
    b.op(&[op::SSEND, 1, p, 1]);
    // p 1.kind_of?(Integer)
    b.op(&[op::LOADI_1, 2]);
    b.op(&[op::GETCONST, 3, int_sym]);
    b.op(&[op::SEND, 2, kind_sym, 1]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(clean, "got: {out}");
    assert_eq!(out, "Integer\ntrue\n");
}

#[test]
fn kind_of_with_a_non_class_raises_type_error() {
    let mut b = IrepBuilder::new(12);
    let kind_sym = b.sym("kind_of?");
    b.op(&[op::LOADI_1, 2]);
    b.op(&[op::LOADI_2, 3]);
    b.op(&[op::SEND, 2, kind_sym, 1]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(!clean);
    assert!(out.contains("TypeError"), "got: {out}");
}

#[test]
fn object_id_is_stable_for_the_same_object() {
    let mut b = IrepBuilder::new(12);
    let oid = b.sym("object_id");
    let eq_sym = b.sym("==");
    let p = b.sym("p");
    let s = b.lit(Lit::Str("x"));
    b.op(&[op::STRING, 2, s]);
    // id twice from the same object, compare
    b.op(&[op::MOVE, 3, 2]);
    b.op(&[op::SEND, 3, oid, 0]);
    b.op(&[op::MOVE, 4, 2]);
    b.op(&[op::SEND, 4, oid, 0]);
    b.op(&[op::SEND, 3, eq_sym, 1]);
    b.op(&[op::MOVE, 5, 3]);
    b.op(&[op::SSEND, 4, p, 1]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(clean, "got: {out}");
    assert_eq!(out, "true\n");
}

#[test]
fn to_s_and_inspect_differ_for_strings() {
    let mut b = IrepBuilder::new(12);
    let to_s = b.sym("to_s");
    let inspect = b.sym("inspect");
    let puts = b.sym("puts");
    let s = b.lit(Lit::Str("hi"));
    b.op(&[op::STRING, 2, s]);
    b.op(&[op::SEND, 2, to_s, 0]);
    b.op(&[op::SSEND, 1, puts, 1]);
    b.op(&[op::STRING, 2, s]);
    b.op(&[op::SEND, 2, inspect, 0]);
    b.op(&[op::SSEND, 1, puts, 1]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(clean, "got: {out}");
    assert_eq!(out, "hi\n\"hi\"\n");
}

#[test]
fn string_to_i_and_to_f_parse_prefixes() {
    let mut b = IrepBuilder::new(12);
    let to_i = b.sym("to_i");
    let to_f = b.sym("to_f");
    let p = b.sym("p");
    let int_str = b.lit(Lit::Str("  -42abc"));
    let flt_str = b.lit(Lit::Str("2.5rest"));
    b.op(&[op::STRING, 2, int_str]);
    b.op(&[op::SEND, 2, to_i, 0]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::STRING, 2, flt_str]);
    b.op(&[op::SEND, 2, to_f, 0]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(clean, "got: {out}");
    assert_eq!(out, "-42\n2.5\n");
}

#[test]
fn numeric_conversions() {
    let mut b = IrepBuilder::new(12);
    let to_f = b.sym("to_f");
    let to_i = b.sym("to_i");
    let abs = b.sym("abs");
    let p = b.sym("p");
    let x = b.lit(Lit::Float(2.7));
    b.op(&[op::LOADI_3, 2]);
    b.op(&[op::SEND, 2, to_f, 0]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::LOADL, 2, x]);
    b.op(&[op::SEND, 2, to_i, 0]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::LOADINEG, 2, 9]);
    b.op(&[op::SEND, 2, abs, 0]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(clean, "got: {out}");
    assert_eq!(out, "3.0\n2\n9\n");
}

#[test]
fn exception_message_falls_back_to_class_name() {
    let mut b = IrepBuilder::new(12);
    let new_sym = b.sym("new");
    let msg_sym = b.sym("message");
    let puts = b.sym("puts");
    let rte = b.sym("RuntimeError");
    b.op(&[op::GETCONST, 2, rte]);
    b.op(&[op::SEND, 2, new_sym, 0]);
    b.op(&[op::SEND, 2, msg_sym, 0]);
    b.op(&[op::SSEND, 1, puts, 1]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(clean, "got: {out}");
    assert_eq!(out, "RuntimeError\n");
}
