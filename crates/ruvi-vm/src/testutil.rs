// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Test support: hand-assembling RITE bytecode images.
//!
//! Tests drive the VM with images built instruction by instruction, the
//! same bytes the reference compiler would emit for the construct under
//! test.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::console::MockConsole;
use crate::memory::OwnedMemory;
use crate::platform::MockPlatform;
use crate::runtime::Runtime;
use ruvi_rite::container;
use std::string::String;
use std::vec::Vec;

/// One literal-pool entry.
pub enum Lit {
    Str(&'static str),
    Int32(i32),
    Int64(i64),
    Float(f64),
}

/// Builder for one IREP record and its children.
pub struct IrepBuilder {
    pub nlocals: u16,
    pub nregs: u16,
    pub code: Vec<u8>,
    pub syms: Vec<String>,
    pub pool: Vec<Lit>,
    pub catches: Vec<(u8, u32, u32, u32)>,
    pub children: Vec<IrepBuilder>,
}

impl IrepBuilder {
    /// An empty record with `nregs` registers.
    #[must_use]
    pub fn new(nregs: u16) -> Self {
        Self {
            nlocals: 0,
            nregs,
            code: Vec::new(),
            syms: Vec::new(),
            pool: Vec::new(),
            catches: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Append instruction bytes.
    pub fn op(&mut self, bytes: &[u8]) -> &mut Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Register a symbol, returning its table index.
    pub fn sym(&mut self, name: &str) -> u8 {
        if let Some(i) = self.syms.iter().position(|s| s == name) {
            return i as u8;
        }
        self.syms.push(String::from(name));
        (self.syms.len() - 1) as u8
    }

    /// Register a literal, returning its pool index.
    pub fn lit(&mut self, lit: Lit) -> u8 {
        self.pool.push(lit);
        (self.pool.len() - 1) as u8
    }

    /// Add a rescue catch handler over `[begin, end]` landing at
    /// `target` (byte offsets).
    pub fn rescue(&mut self, begin: u32, end: u32, target: u32) -> &mut Self {
        self.catches
            .push((container::catch_type::RESCUE, begin, end, target));
        self
    }

    /// Current code length in bytes (for computing jump offsets).
    #[must_use]
    pub fn here(&self) -> u32 {
        self.code.len() as u32
    }

    fn encode(&self, out: &mut Vec<u8>) {
        let record_at = out.len();
        out.extend_from_slice(&[0; 4]); // record_size patched below
        out.extend_from_slice(&self.nlocals.to_be_bytes());
        out.extend_from_slice(&self.nregs.to_be_bytes());
        out.extend_from_slice(&(self.children.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.catches.len() as u16).to_be_bytes());
        out.extend_from_slice(&(self.code.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.code);
        for (kind, begin, end, target) in &self.catches {
            out.push(*kind);
            out.extend_from_slice(&begin.to_be_bytes());
            out.extend_from_slice(&end.to_be_bytes());
            out.extend_from_slice(&target.to_be_bytes());
        }
        out.extend_from_slice(&(self.pool.len() as u16).to_be_bytes());
        for lit in &self.pool {
            match lit {
                Lit::Str(s) => {
                    out.push(container::pool_tag::STR);
                    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
                    out.extend_from_slice(s.as_bytes());
                    out.push(0);
                }
                Lit::Int32(n) => {
                    out.push(container::pool_tag::INT32);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                Lit::Int64(n) => {
                    out.push(container::pool_tag::INT64);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                Lit::Float(x) => {
                    out.push(container::pool_tag::FLOAT);
                    out.extend_from_slice(&x.to_be_bytes());
                }
            }
        }
        out.extend_from_slice(&(self.syms.len() as u16).to_be_bytes());
        for s in &self.syms {
            out.extend_from_slice(&(s.len() as u16).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }
        let record_size = (out.len() - record_at) as u32;
        out[record_at..record_at + 4].copy_from_slice(&record_size.to_be_bytes());

        for child in &self.children {
            child.encode(out);
        }
    }

    /// Wrap this record tree in a full RITE02 image.
    #[must_use]
    pub fn image(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        self.encode(&mut payload);

        let mut out = Vec::new();
        out.extend_from_slice(container::IDENT);
        out.extend_from_slice(&[0, 3]); // version
        out.extend_from_slice(&[0; 4]); // total_size patched below
        out.extend_from_slice(container::COMPILER_NAME);
        out.extend_from_slice(container::COMPILER_VERSION);

        out.extend_from_slice(container::SECTION_IREP);
        out.extend_from_slice(&((payload.len() + container::SECTION_PREFIX_LEN) as u32).to_be_bytes());
        out.extend_from_slice(&payload);

        out.extend_from_slice(container::SECTION_END);
        out.extend_from_slice(&(container::SECTION_PREFIX_LEN as u32).to_be_bytes());

        let total = out.len() as u32;
        out[8..12].copy_from_slice(&total.to_be_bytes());
        out
    }
}

/// A runtime over mock host pieces, ready to run test images.
#[must_use]
pub fn runtime(pool_size: usize) -> Runtime<OwnedMemory, MockConsole, MockPlatform> {
    Runtime::new(
        OwnedMemory::new(pool_size),
        MockConsole::new(),
        MockPlatform::new(),
    )
    .expect("runtime init")
}

/// Run one image to completion and return (clean, console output).
pub fn run_image(image: &[u8]) -> (bool, String) {
    let mut rt = runtime(128 * 1024);
    rt.create_task(image, None).expect("create_task");
    let clean = rt.run();
    (clean, rt.console().output_string())
}
