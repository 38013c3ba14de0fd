// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Pool-resident object layouts and their constructors.
//!
//! Every compound value is one small fixed header block; variable-size
//! content (string bytes, array elements, hash pairs, ivar tables)
//! lives in a separate data block referenced from the header. Mutation
//! reallocates the data block and updates the header in place, so
//! aliased references observe the mutation (shared-string and
//! shared-array semantics).
//!
//! Constructors take ownership of the values passed in: the caller's
//! reference moves into the container without a refcount change.

use super::{ObjHead, Value, kv, tag};
use crate::memory::Memory;
use crate::pool::Pool;
use crate::symbol::SymId;
use crate::types::Addr;

/// String header; bytes live in the `data` block.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HeapString {
    pub head: ObjHead,
    pub len: u32,
    pub data: Addr,
}

/// Array header; `cap` elements of storage live in the `data` block.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HeapArray {
    pub head: ObjHead,
    pub len: u16,
    pub cap: u16,
    pub data: Addr,
}

/// Hash header; `cap` key/value pairs of storage live in `data`.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HeapHash {
    pub head: ObjHead,
    pub len: u16,
    pub cap: u16,
    pub data: Addr,
}

/// Range object. First/last are owned values.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HeapRange {
    pub head: ObjHead,
    pub exclusive: u8,
    pub _pad: [u8; 3],
    pub first: Value,
    pub last: Value,
}

/// Instance header; the ivar table is a key/value store block.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HeapInstance {
    pub head: ObjHead,
    pub class: Addr,
    pub ivars: Addr,
}

/// Proc object capturing its creation frame.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HeapProc {
    pub head: ObjHead,
    /// Bytecode body.
    pub irep: Addr,
    /// `self` at creation time (owned).
    pub self_val: Value,
    /// Method the proc was created in (raw symbol id).
    pub method: u32,
    /// Class resolving `super` inside the proc.
    pub own_class: Addr,
}

/// Exception object.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HeapException {
    pub head: ObjHead,
    pub class: Addr,
    /// Message string or nil (owned).
    pub message: Value,
}

/// Discriminator byte for handle objects.
pub mod handle_kind {
    /// Task reference.
    pub const TASK: u8 = 0;
    /// Mutex.
    pub const MUTEX: u8 = 1;
}

/// Handle wrapping a task id.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HeapTaskRef {
    pub head: ObjHead,
    pub kind: u8,
    pub task: u8,
    pub _pad: [u8; 2],
}

/// Non-reentrant binary mutex with a FIFO waiter list.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct HeapMutex {
    pub head: ObjHead,
    pub kind: u8,
    pub locked: u8,
    /// Task id holding the lock; meaningful only while locked.
    pub owner: u8,
    pub wq_len: u8,
    /// FIFO of waiting task ids.
    pub wq: [u8; 8],
}

const VALUE_SIZE: u32 = core::mem::size_of::<Value>() as u32;

// --- Strings ---

/// Allocate a string initialized from `bytes`.
pub fn string_new<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    owner: u8,
    bytes: &[u8],
) -> Option<Value> {
    let data = pool.alloc(mem, bytes.len().max(1) as u32, owner)?;
    mem.slice_mut(data, bytes.len()).copy_from_slice(bytes);
    let header = HeapString {
        head: ObjHead::new(tag::STRING),
        len: bytes.len() as u32,
        data,
    };
    let Some(addr) = alloc_header(pool, mem, owner, header) else {
        pool.free(mem, data);
        return None;
    };
    Some(Value::String(addr))
}

/// Length in bytes of the string at `addr`.
#[must_use]
pub fn string_len<M: Memory>(mem: &M, addr: Addr) -> u32 {
    let h: HeapString = mem.read(addr);
    h.len
}

/// Borrow the bytes of the string at `addr`.
#[must_use]
pub fn string_bytes<M: Memory>(mem: &M, addr: Addr) -> &[u8] {
    let h: HeapString = mem.read(addr);
    mem.slice(h.data, h.len as usize)
}

/// Allocate a string whose bytes are copied from elsewhere in the pool
/// (literal data inside an IREP block).
pub fn string_new_from_pool<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    owner: u8,
    src: Addr,
    len: u32,
) -> Option<Value> {
    let data = pool.alloc(mem, len.max(1), owner)?;
    mem.copy_within(src, data, len as usize);
    let header = HeapString {
        head: ObjHead::new(tag::STRING),
        len,
        data,
    };
    let Some(addr) = alloc_header(pool, mem, owner, header) else {
        pool.free(mem, data);
        return None;
    };
    Some(Value::String(addr))
}

/// Append raw bytes to the string at `addr`, growing its data block.
pub fn string_append_bytes<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    addr: Addr,
    bytes: &[u8],
) -> Option<()> {
    if bytes.is_empty() {
        return Some(());
    }
    let mut h: HeapString = mem.read(addr);
    let new_len = h.len + bytes.len() as u32;
    h.data = pool.realloc(mem, h.data, new_len)?;
    mem.slice_mut(h.data.add(h.len), bytes.len())
        .copy_from_slice(bytes);
    h.len = new_len;
    mem.write(addr, h);
    Some(())
}

/// Append the string at `src` to the string at `dst`.
///
/// Handles `dst == src` (self-append) by copying within the pool after
/// the data block has been resized.
pub fn string_append<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    dst: Addr,
    src: Addr,
) -> Option<()> {
    let src_len = string_len(mem, src);
    if src_len == 0 {
        return Some(());
    }
    let mut d: HeapString = mem.read(dst);
    let new_len = d.len + src_len;
    d.data = pool.realloc(mem, d.data, new_len)?;
    mem.write(dst, d);
    // Re-read src after the realloc: for self-append its data block is
    // the block that just moved.
    let s: HeapString = mem.read(src);
    mem.copy_within(s.data, d.data.add(d.len), src_len as usize);
    d.len = new_len;
    mem.write(dst, d);
    Some(())
}

// --- Arrays ---

/// Allocate an empty array with room for `cap` elements.
pub fn array_new<M: Memory>(pool: &mut Pool, mem: &mut M, owner: u8, cap: u16) -> Option<Value> {
    let cap = cap.max(1);
    let data = pool.alloc(mem, u32::from(cap) * VALUE_SIZE, owner)?;
    let header = HeapArray {
        head: ObjHead::new(tag::ARRAY),
        len: 0,
        cap,
        data,
    };
    let Some(addr) = alloc_header(pool, mem, owner, header) else {
        pool.free(mem, data);
        return None;
    };
    Some(Value::Array(addr))
}

/// Allocate an array taking ownership of `elems`.
pub fn array_new_from<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    owner: u8,
    elems: &[Value],
) -> Option<Value> {
    let v = array_new(pool, mem, owner, elems.len() as u16)?;
    let Value::Array(addr) = v else { return None };
    let mut h: HeapArray = mem.read(addr);
    for (i, e) in elems.iter().enumerate() {
        mem.write(h.data.add(i as u32 * VALUE_SIZE), *e);
    }
    h.len = elems.len() as u16;
    mem.write(addr, h);
    Some(v)
}

/// Number of elements in the array at `addr`.
#[must_use]
pub fn array_len<M: Memory>(mem: &M, addr: Addr) -> u16 {
    let h: HeapArray = mem.read(addr);
    h.len
}

/// Element `i` of the array at `addr` (no refcount change); nil when out
/// of range.
#[must_use]
pub fn array_get<M: Memory>(mem: &M, addr: Addr, i: usize) -> Value {
    let h: HeapArray = mem.read(addr);
    if i >= h.len as usize {
        return Value::Nil;
    }
    mem.read(h.data.add(i as u32 * VALUE_SIZE))
}

/// Store `v` (owned) at index `i`, releasing the previous occupant and
/// extending the array with nils when `i` is past the end.
pub fn array_set<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    addr: Addr,
    i: usize,
    v: Value,
) -> Option<()> {
    let mut h: HeapArray = mem.read(addr);
    if i >= h.cap as usize {
        let new_cap = (i + 1).next_power_of_two().max(4) as u16;
        h.data = pool.realloc(mem, h.data, u32::from(new_cap) * VALUE_SIZE)?;
        h.cap = new_cap;
    }
    while (h.len as usize) < i {
        mem.write(h.data.add(u32::from(h.len) * VALUE_SIZE), Value::Nil);
        h.len += 1;
    }
    if i < h.len as usize {
        let old: Value = mem.read(h.data.add(i as u32 * VALUE_SIZE));
        super::decref(pool, mem, old);
    } else {
        h.len = i as u16 + 1;
    }
    mem.write(h.data.add(i as u32 * VALUE_SIZE), v);
    mem.write(addr, h);
    Some(())
}

/// Append `v` (owned) to the array at `addr`.
pub fn array_push<M: Memory>(pool: &mut Pool, mem: &mut M, addr: Addr, v: Value) -> Option<()> {
    let h: HeapArray = mem.read(addr);
    array_set(pool, mem, addr, h.len as usize, v)
}

/// Remove and return the last element (ownership transfers out); `None`
/// when empty.
pub fn array_pop<M: Memory>(mem: &mut M, addr: Addr) -> Option<Value> {
    let mut h: HeapArray = mem.read(addr);
    if h.len == 0 {
        return None;
    }
    h.len -= 1;
    let v = mem.read(h.data.add(u32::from(h.len) * VALUE_SIZE));
    mem.write(addr, h);
    Some(v)
}

// --- Hashes ---

/// Allocate an empty hash with room for `cap` pairs.
pub fn hash_new<M: Memory>(pool: &mut Pool, mem: &mut M, owner: u8, cap: u16) -> Option<Value> {
    let cap = cap.max(1);
    let data = pool.alloc(mem, u32::from(cap) * 2 * VALUE_SIZE, owner)?;
    let header = HeapHash {
        head: ObjHead::new(tag::HASH),
        len: 0,
        cap,
        data,
    };
    let Some(addr) = alloc_header(pool, mem, owner, header) else {
        pool.free(mem, data);
        return None;
    };
    Some(Value::Hash(addr))
}

/// Number of pairs in the hash at `addr`.
#[must_use]
pub fn hash_len<M: Memory>(mem: &M, addr: Addr) -> u16 {
    let h: HeapHash = mem.read(addr);
    h.len
}

/// Pair `i` of the hash at `addr` (no refcount change).
#[must_use]
pub fn hash_entry<M: Memory>(mem: &M, addr: Addr, i: usize) -> (Value, Value) {
    let h: HeapHash = mem.read(addr);
    let at = h.data.add(i as u32 * 2 * VALUE_SIZE);
    (mem.read(at), mem.read(at.add(VALUE_SIZE)))
}

/// Look up `key` (no refcount change); `None` when absent.
#[must_use]
pub fn hash_get<M: Memory>(mem: &M, addr: Addr, key: Value) -> Option<Value> {
    let h: HeapHash = mem.read(addr);
    for i in 0..h.len as usize {
        let at = h.data.add(i as u32 * 2 * VALUE_SIZE);
        let k: Value = mem.read(at);
        if super::compare(mem, k, key) == 0 {
            return Some(mem.read(at.add(VALUE_SIZE)));
        }
    }
    None
}

/// Insert or replace `key => val` (both owned). Replacement releases the
/// old value and the caller's duplicate key reference.
pub fn hash_set<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    addr: Addr,
    key: Value,
    val: Value,
) -> Option<()> {
    let mut h: HeapHash = mem.read(addr);
    for i in 0..h.len as usize {
        let at = h.data.add(i as u32 * 2 * VALUE_SIZE);
        let k: Value = mem.read(at);
        if super::compare(mem, k, key) == 0 {
            let old: Value = mem.read(at.add(VALUE_SIZE));
            super::decref(pool, mem, old);
            super::decref(pool, mem, key);
            mem.write(at.add(VALUE_SIZE), val);
            return Some(());
        }
    }
    if h.len == h.cap {
        let new_cap = (h.cap * 2).max(4);
        h.data = pool.realloc(mem, h.data, u32::from(new_cap) * 2 * VALUE_SIZE)?;
        h.cap = new_cap;
    }
    let at = h.data.add(u32::from(h.len) * 2 * VALUE_SIZE);
    mem.write(at, key);
    mem.write(at.add(VALUE_SIZE), val);
    h.len += 1;
    mem.write(addr, h);
    Some(())
}

// --- Ranges ---

/// Allocate a range taking ownership of `first` and `last`.
pub fn range_new<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    owner: u8,
    first: Value,
    last: Value,
    exclusive: bool,
) -> Option<Value> {
    let addr = alloc_header(
        pool,
        mem,
        owner,
        HeapRange {
            head: ObjHead::new(tag::RANGE),
            exclusive: u8::from(exclusive),
            _pad: [0; 3],
            first,
            last,
        },
    )?;
    Some(Value::Range(addr))
}

// --- Instances ---

/// Allocate an instance of `class` with an empty ivar table.
pub fn instance_new<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    owner: u8,
    class: Addr,
) -> Option<Value> {
    let ivars = kv::kv_new(pool, mem, owner, 0)?;
    let header = HeapInstance {
        head: ObjHead::new(tag::OBJECT),
        class,
        ivars,
    };
    let Some(addr) = alloc_header(pool, mem, owner, header) else {
        pool.free(mem, ivars);
        return None;
    };
    Some(Value::Object(addr))
}

/// Read instance ivar `sym` with a fresh reference; nil when unset.
#[must_use]
pub fn ivar_get<M: Memory>(mem: &mut M, addr: Addr, sym: SymId) -> Value {
    let inst: HeapInstance = mem.read(addr);
    match kv::kv_get(mem, inst.ivars, sym) {
        Some(v) => {
            super::incref(mem, v);
            v
        }
        None => Value::Nil,
    }
}

/// Store instance ivar `sym = val` (owned).
pub fn ivar_set<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    addr: Addr,
    sym: SymId,
    val: Value,
) -> Option<()> {
    let mut inst: HeapInstance = mem.read(addr);
    inst.ivars = kv::kv_set(pool, mem, inst.ivars, sym, val)?;
    mem.write(addr, inst);
    Some(())
}

// --- Procs ---

/// Allocate a proc; `self_val` is owned.
pub fn proc_new<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    owner: u8,
    irep: Addr,
    self_val: Value,
    method: SymId,
    own_class: Addr,
) -> Option<Value> {
    let addr = alloc_header(
        pool,
        mem,
        owner,
        HeapProc {
            head: ObjHead::new(tag::PROC),
            irep,
            self_val,
            method: u32::from(method.as_u16()),
            own_class,
        },
    )?;
    Some(Value::Proc(addr))
}

// --- Exceptions ---

/// Allocate an exception of `class`; `message` (string or nil) is owned.
pub fn exception_new<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    owner: u8,
    class: Addr,
    message: Value,
) -> Option<Value> {
    let addr = alloc_header(
        pool,
        mem,
        owner,
        HeapException {
            head: ObjHead::new(tag::EXCEPTION),
            class,
            message,
        },
    )?;
    Some(Value::Exception(addr))
}

// --- Handles ---

/// The discriminator of the handle object at `addr`.
#[must_use]
pub fn handle_kind_of<M: Memory>(mem: &M, addr: Addr) -> u8 {
    mem.read(addr.add(core::mem::size_of::<ObjHead>() as u32))
}

/// Allocate a handle wrapping `task_id`.
pub fn task_ref_new<M: Memory>(
    pool: &mut Pool,
    mem: &mut M,
    owner: u8,
    task_id: u8,
) -> Option<Value> {
    let addr = alloc_header(
        pool,
        mem,
        owner,
        HeapTaskRef {
            head: ObjHead::new(tag::HANDLE),
            kind: handle_kind::TASK,
            task: task_id,
            _pad: [0; 2],
        },
    )?;
    Some(Value::Handle(addr))
}

/// Allocate an unlocked mutex.
pub fn mutex_new<M: Memory>(pool: &mut Pool, mem: &mut M, owner: u8) -> Option<Value> {
    let addr = alloc_header(
        pool,
        mem,
        owner,
        HeapMutex {
            head: ObjHead::new(tag::HANDLE),
            kind: handle_kind::MUTEX,
            locked: 0,
            owner: 0,
            wq_len: 0,
            wq: [0; 8],
        },
    )?;
    Some(Value::Handle(addr))
}

/// Allocate a header block, rolling back nothing on failure (callers
/// release any owned parts themselves).
fn alloc_header<M: Memory, T>(pool: &mut Pool, mem: &mut M, owner: u8, header: T) -> Option<Addr> {
    let addr = pool.alloc(mem, core::mem::size_of::<T>() as u32, owner)?;
    mem.write(addr, header);
    Some(addr)
}
