// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! # RITE bytecode definitions
//!
//! Pure-data definitions of the RITE bytecode format executed by the Ruvi
//! VM: the on-disk container envelope, the instruction set, operand
//! fetching, and the catch-handler record.
//!
//! This crate has no dependencies and no runtime state; everything here
//! is constants, `const fn` helpers, and plain structs. The loader and
//! interpreter in `ruvi-vm` build on top of it.

#![no_std]

pub mod container;
pub mod insn;
pub mod op;

#[cfg(test)]
mod lib_test;
