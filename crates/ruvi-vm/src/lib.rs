// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! # Ruvi VM
//!
//! Embeddable virtual machine for RITE bytecode.
//!
//! This crate provides:
//! - A fixed-pool allocator serving all runtime allocation from one
//!   caller-supplied byte buffer
//! - A symbol interner mapping names to compact ids
//! - Reference-counted dynamic values and their heap object layouts
//! - A class/method registry with single-inheritance lookup
//! - A bytecode loader building pool-resident IREP trees
//! - A register-based interpreter with call frames, Proc invocation and
//!   exception unwinding
//! - A cooperative scheduler multiplexing tasks over one native thread
//! - A printf engine shared by `printf`, `sprintf` and value inspection
//!
//! The VM never allocates from the host: everything dynamic lives in the
//! pool, and the host talks to the runtime through the [`memory::Memory`],
//! [`console::Console`] and [`platform::Platform`] traits.

#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[cfg(any(test, feature = "std"))]
extern crate std;

#[cfg(test)]
pub(crate) mod testutil;

pub mod builtins;
pub mod class;
pub mod console;
pub mod loader;
pub mod memory;
pub mod platform;
pub mod pool;
pub mod runtime;
pub mod symbol;
pub mod task;
pub mod types;
pub mod value;
pub mod vm;

// Re-export commonly used types at crate root
pub use runtime::Runtime;
pub use types::Addr;
pub use value::Value;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
