// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Core type definitions for the Ruvi VM.
//!
//! This module provides type-safe wrappers for pool offsets and other
//! fundamental ids. Using newtypes prevents mixing incompatible values
//! (e.g., passing a symbol id where a pool address is expected).


mod addr;

pub use addr::Addr;
