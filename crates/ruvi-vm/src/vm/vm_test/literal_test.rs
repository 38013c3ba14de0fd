// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Literal and register-move instructions.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{IrepBuilder, Lit, run_image};
use ruvi_rite::op;

/// Build `p <expr-in-R2>` around the given loading code.
fn p_of(load: impl FnOnce(&mut IrepBuilder)) -> (bool, std::string::String) {
    let mut b = IrepBuilder::new(10);
    load(&mut b);
    let p = b.sym("p");
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::STOP]);
    run_image(&b.image())
}

#[test]
fn small_immediates() {
    let (clean, out) = p_of(|b| {
        b.op(&[op::LOADI_7, 2]);
    });
    assert!(clean);
    assert_eq!(out, "7\n");
}

#[test]
fn negative_one_immediate() {
    let (clean, out) = p_of(|b| {
        b.op(&[op::LOADI__1, 2]);
    });
    assert!(clean);
    assert_eq!(out, "-1\n");
}

#[test]
fn byte_immediates() {
    let (_, out) = p_of(|b| {
        b.op(&[op::LOADI, 2, 200]);
    });
    assert_eq!(out, "200\n");

    let (_, out) = p_of(|b| {
        b.op(&[op::LOADINEG, 2, 5]);
    });
    assert_eq!(out, "-5\n");
}

#[test]
fn sixteen_bit_immediate_is_signed() {
    let (_, out) = p_of(|b| {
        let bytes = (-1234i16).to_be_bytes();
        b.op(&[op::LOADI16, 2, bytes[0], bytes[1]]);
    });
    assert_eq!(out, "-1234\n");
}

#[test]
fn thirty_two_bit_immediate() {
    let (_, out) = p_of(|b| {
        let bytes = 100_000i32.to_be_bytes();
        b.op(&[op::LOADI32, 2, bytes[0], bytes[1], bytes[2], bytes[3]]);
    });
    assert_eq!(out, "100000\n");
}

#[test]
fn nil_true_false() {
    let (_, out) = p_of(|b| {
        b.op(&[op::LOADNIL, 2]);
    });
    assert_eq!(out, "nil\n");

    let (_, out) = p_of(|b| {
        b.op(&[op::LOADT, 2]);
    });
    assert_eq!(out, "true\n");

    let (_, out) = p_of(|b| {
        b.op(&[op::LOADF, 2]);
    });
    assert_eq!(out, "false\n");
}

#[test]
fn pool_literals() {
    let (_, out) = p_of(|b| {
        let lit = b.lit(Lit::Int64(1 << 40));
        b.op(&[op::LOADL, 2, lit]);
    });
    assert_eq!(out, "1099511627776\n");

    let (_, out) = p_of(|b| {
        let lit = b.lit(Lit::Float(2.5));
        b.op(&[op::LOADL, 2, lit]);
    });
    assert_eq!(out, "2.5\n");
}

#[test]
fn string_literals_are_fresh_each_load() {
    // s = "ab"; s << 'c'; then load the literal again: unchanged.
    let mut b = IrepBuilder::new(10);
    let lit = b.lit(Lit::Str("ab"));
    let p = b.sym("p");
    b.op(&[op::STRING, 2, lit]);
    b.op(&[op::LOADI, 3, 99]); // 'c'
    b.op(&[op::STRCAT, 2]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::STRING, 2, lit]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::STOP]);

    let (clean, out) = run_image(&b.image());
    assert!(clean);
    assert_eq!(out, "\"abc\"\n\"ab\"\n");
}

#[test]
fn move_copies_between_registers() {
    let (_, out) = p_of(|b| {
        b.op(&[op::LOADI, 4, 9]);
        b.op(&[op::MOVE, 2, 4]);
    });
    assert_eq!(out, "9\n");
}

#[test]
fn symbols_load_from_the_table() {
    let mut b = IrepBuilder::new(10);
    let s = b.sym("hello");
    let p = b.sym("p");
    b.op(&[op::LOADSYM, 2, s]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::STOP]);
    let (_, out) = run_image(&b.image());
    assert_eq!(out, ":hello\n");
}

#[test]
fn global_variables_default_to_nil_and_store() {
    let mut b = IrepBuilder::new(10);
    let g = b.sym("$g");
    let p = b.sym("p");
    b.op(&[op::GETGV, 2, g]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::LOADI, 2, 5]);
    b.op(&[op::SETGV, 2, g]);
    b.op(&[op::GETGV, 2, g]);
    b.op(&[op::SSEND, 1, p, 1]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(clean);
    assert_eq!(out, "nil\n5\n");
}

#[test]
fn strcat_mutates_in_place() {
    let mut b = IrepBuilder::new(10);
    let hello = b.lit(Lit::Str("hello "));
    let world = b.lit(Lit::Str("world"));
    let puts = b.sym("puts");
    b.op(&[op::STRING, 2, hello]);
    b.op(&[op::STRING, 3, world]);
    b.op(&[op::STRCAT, 2]);
    b.op(&[op::SSEND, 1, puts, 1]);
    b.op(&[op::STOP]);
    let (_, out) = run_image(&b.image());
    assert_eq!(out, "hello world\n");
}

#[test]
fn strcat_of_unsupported_type_raises() {
    let mut b = IrepBuilder::new(10);
    let s = b.lit(Lit::Str("x"));
    b.op(&[op::STRING, 2, s]);
    b.op(&[op::LOADT, 3]);
    b.op(&[op::STRCAT, 2]);
    b.op(&[op::STOP]);
    let (clean, out) = run_image(&b.image());
    assert!(!clean);
    assert!(out.contains("TypeError"), "got: {out}");
}
