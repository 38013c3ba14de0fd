// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Reference counting and duplication.
//!
//! Values are born with refcount 1. `incref`/`decref` are no-ops for
//! immediate values and for classes (classes live for the process
//! lifetime). When a count reaches zero the header tag selects a
//! destructor that releases contained values before freeing the block.
//!
//! Reference cycles are not collected: a cycle keeps itself alive until
//! the pool is torn down. That is the documented contract; cycles leak
//! but never corrupt.

use super::heap::{HeapArray, HeapException, HeapHash, HeapInstance, HeapProc, HeapRange, HeapString};
use super::{ObjHead, Value, kv, tag};
use crate::memory::Memory;
use crate::pool::Pool;
use crate::types::Addr;

/// Add one reference to a heap value. No-op for immediates and classes.
pub fn incref<M: Memory>(mem: &mut M, v: Value) {
    if matches!(v, Value::Class(_)) {
        return;
    }
    let Some(addr) = v.heap_addr() else { return };
    let mut head: ObjHead = mem.read(addr);
    head.refcnt += 1;
    mem.write(addr, head);
}

/// Drop one reference; destructs the object when the count hits zero.
pub fn decref<M: Memory>(pool: &mut Pool, mem: &mut M, v: Value) {
    if matches!(v, Value::Class(_)) {
        return;
    }
    let Some(addr) = v.heap_addr() else { return };
    let mut head: ObjHead = mem.read(addr);
    debug_assert!(head.refcnt > 0, "decref of dead object at {addr:?}");
    debug_assert_eq!(head.tag, v.heap_tag().unwrap_or(0), "tag mismatch");
    if head.refcnt <= 1 {
        destroy(pool, mem, addr, head.tag);
    } else {
        head.refcnt -= 1;
        mem.write(addr, head);
    }
}

/// Deep-release an object's contents, then free its blocks.
fn destroy<M: Memory>(pool: &mut Pool, mem: &mut M, addr: Addr, obj_tag: u8) {
    match obj_tag {
        tag::STRING => {
            let h: HeapString = mem.read(addr);
            pool.free(mem, h.data);
        }
        tag::ARRAY => {
            let h: HeapArray = mem.read(addr);
            for i in 0..h.len as usize {
                let e: Value = mem.read(h.data.add(i as u32 * 16));
                decref(pool, mem, e);
            }
            pool.free(mem, h.data);
        }
        tag::HASH => {
            let h: HeapHash = mem.read(addr);
            for i in 0..h.len as usize {
                let at = h.data.add(i as u32 * 32);
                let k: Value = mem.read(at);
                let v: Value = mem.read(at.add(16));
                decref(pool, mem, k);
                decref(pool, mem, v);
            }
            pool.free(mem, h.data);
        }
        tag::RANGE => {
            let h: HeapRange = mem.read(addr);
            decref(pool, mem, h.first);
            decref(pool, mem, h.last);
        }
        tag::OBJECT => {
            let h: HeapInstance = mem.read(addr);
            kv::kv_release_contents(pool, mem, h.ivars);
            pool.free(mem, h.ivars);
        }
        tag::PROC => {
            let h: HeapProc = mem.read(addr);
            decref(pool, mem, h.self_val);
        }
        tag::EXCEPTION => {
            let h: HeapException = mem.read(addr);
            decref(pool, mem, h.message);
        }
        tag::HANDLE => {}
        _ => {
            debug_assert!(false, "destroy of unexpected tag {obj_tag}");
        }
    }
    pool.free(mem, addr);
}

/// Duplicate a value.
///
/// Containers are copied shallowly (the copy's contents are incref'd);
/// instances copy their ivar table; procs copy the header. Immediates,
/// classes and handles return themselves.
pub fn dup<M: Memory>(pool: &mut Pool, mem: &mut M, owner: u8, v: Value) -> Option<Value> {
    match v {
        Value::String(addr) => {
            let h: HeapString = mem.read(addr);
            super::heap::string_new_from_pool(pool, mem, owner, h.data, h.len)
        }
        Value::Array(addr) => {
            let h: HeapArray = mem.read(addr);
            let copy = super::heap::array_new(pool, mem, owner, h.len.max(1))?;
            let Value::Array(copy_addr) = copy else {
                return None;
            };
            let mut ch: HeapArray = mem.read(copy_addr);
            mem.copy_within(h.data, ch.data, h.len as usize * 16);
            ch.len = h.len;
            mem.write(copy_addr, ch);
            for i in 0..h.len as usize {
                let e: Value = mem.read(ch.data.add(i as u32 * 16));
                incref(mem, e);
            }
            Some(copy)
        }
        Value::Hash(addr) => {
            let h: HeapHash = mem.read(addr);
            let copy = super::heap::hash_new(pool, mem, owner, h.len.max(1))?;
            let Value::Hash(copy_addr) = copy else {
                return None;
            };
            let mut ch: HeapHash = mem.read(copy_addr);
            mem.copy_within(h.data, ch.data, h.len as usize * 32);
            ch.len = h.len;
            mem.write(copy_addr, ch);
            for i in 0..h.len as usize * 2 {
                let e: Value = mem.read(ch.data.add(i as u32 * 16));
                incref(mem, e);
            }
            Some(copy)
        }
        Value::Range(addr) => {
            let h: HeapRange = mem.read(addr);
            incref(mem, h.first);
            incref(mem, h.last);
            super::heap::range_new(pool, mem, owner, h.first, h.last, h.exclusive != 0)
        }
        Value::Object(addr) => {
            let h: HeapInstance = mem.read(addr);
            let copy = super::heap::instance_new(pool, mem, owner, h.class)?;
            let Value::Object(copy_addr) = copy else {
                return None;
            };
            let Some(ivars) = kv::kv_dup(pool, mem, owner, h.ivars) else {
                decref(pool, mem, copy);
                return None;
            };
            let mut ch: HeapInstance = mem.read(copy_addr);
            pool.free(mem, ch.ivars);
            ch.ivars = ivars;
            mem.write(copy_addr, ch);
            Some(copy)
        }
        Value::Proc(addr) => {
            let h: HeapProc = mem.read(addr);
            incref(mem, h.self_val);
            super::heap::proc_new(
                pool,
                mem,
                owner,
                h.irep,
                h.self_val,
                crate::symbol::SymId::new(h.method as u16),
                h.own_class,
            )
        }
        Value::Exception(addr) => {
            let h: HeapException = mem.read(addr);
            incref(mem, h.message);
            super::heap::exception_new(pool, mem, owner, h.class, h.message)
        }
        other => Some(other),
    }
}
