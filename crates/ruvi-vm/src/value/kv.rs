// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Symbol-keyed value store.
//!
//! One store is a single pool block: a small header followed by inline
//! `(symbol, value)` entries. The same layout backs instance variable
//! tables, class variables, globals and the constant table. Growth
//! reallocates the whole block, so every caller holds the store by a
//! single address it writes back after mutation.

use super::Value;
use crate::memory::Memory;
use crate::pool::Pool;
use crate::symbol::SymId;
use crate::types::Addr;

#[repr(C)]
#[derive(Clone, Copy, Debug)]
struct KvHead {
    len: u16,
    cap: u16,
    _pad: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug)]
struct KvEnt {
    sym: u32,
    _pad: u32,
    val: Value,
}

const HEAD_SIZE: u32 = core::mem::size_of::<KvHead>() as u32;
const ENT_SIZE: u32 = core::mem::size_of::<KvEnt>() as u32;

const fn block_size(cap: u16) -> u32 {
    HEAD_SIZE + (cap as u32) * ENT_SIZE
}

const fn ent_addr(kv: Addr, i: usize) -> Addr {
    kv.add(HEAD_SIZE + i as u32 * ENT_SIZE)
}

/// Allocate an empty store with room for `cap` entries.
pub fn kv_new<M: Memory>(pool: &mut Pool, mem: &mut M, owner: u8, cap: u16) -> Option<Addr> {
    let kv = pool.alloc(mem, block_size(cap), owner)?;
    mem.write(
        kv,
        KvHead {
            len: 0,
            cap,
            _pad: 0,
        },
    );
    Some(kv)
}

/// Number of entries.
#[must_use]
pub fn kv_len<M: Memory>(mem: &M, kv: Addr) -> u16 {
    let h: KvHead = mem.read(kv);
    h.len
}

/// Entry `i` as `(symbol, value)`, no refcount change.
#[must_use]
pub fn kv_entry<M: Memory>(mem: &M, kv: Addr, i: usize) -> (SymId, Value) {
    let e: KvEnt = mem.read(ent_addr(kv, i));
    (SymId::new(e.sym as u16), e.val)
}

/// Look up `sym`, no refcount change.
#[must_use]
pub fn kv_get<M: Memory>(mem: &M, kv: Addr, sym: SymId) -> Option<Value> {
    let h: KvHead = mem.read(kv);
    for i in 0..h.len as usize {
        let e: KvEnt = mem.read(ent_addr(kv, i));
        if e.sym == u32::from(sym.as_u16()) {
            return Some(e.val);
        }
    }
    None
}

/// Insert or replace `sym = val` (owned), releasing a replaced value.
///
/// Returns the possibly-moved store address; the caller must write it
/// back to wherever it keeps the store.
pub fn kv_set<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    kv: Addr,
    sym: SymId,
    val: Value,
) -> Option<Addr> {
    let mut h: KvHead = mem.read(kv);
    for i in 0..h.len as usize {
        let at = ent_addr(kv, i);
        let mut e: KvEnt = mem.read(at);
        if e.sym == u32::from(sym.as_u16()) {
            super::decref(pool, mem, e.val);
            e.val = val;
            mem.write(at, e);
            return Some(kv);
        }
    }
    let mut kv = kv;
    if h.len == h.cap {
        let new_cap = (h.cap * 2).max(4);
        kv = pool.realloc(mem, kv, block_size(new_cap))?;
        h.cap = new_cap;
    }
    mem.write(
        ent_addr(kv, h.len as usize),
        KvEnt {
            sym: u32::from(sym.as_u16()),
            _pad: 0,
            val,
        },
    );
    h.len += 1;
    mem.write(kv, h);
    Some(kv)
}

/// Release every stored value (keys are immediates).
pub fn kv_release_contents<M: Memory>(pool: &mut Pool, mem: &mut M, kv: Addr) {
    let h: KvHead = mem.read(kv);
    for i in 0..h.len as usize {
        let e: KvEnt = mem.read(ent_addr(kv, i));
        super::decref(pool, mem, e.val);
    }
}

/// Duplicate a store; the copy's values are incref'd.
pub fn kv_dup<M: Memory>(pool: &mut Pool, mem: &mut M, owner: u8, kv: Addr) -> Option<Addr> {
    let h: KvHead = mem.read(kv);
    let copy = pool.alloc(mem, block_size(h.cap), owner)?;
    mem.copy_within(kv, copy, block_size(h.len.min(h.cap)) as usize);
    mem.write(copy, h);
    for i in 0..h.len as usize {
        let e: KvEnt = mem.read(ent_addr(copy, i));
        super::incref(mem, e.val);
    }
    Some(copy)
}
