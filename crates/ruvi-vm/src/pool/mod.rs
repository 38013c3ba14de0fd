// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Fixed-pool allocator.
//!
//! All runtime allocation is served from the caller-supplied byte
//! buffer. The pool carves the buffer into blocks, each preceded by a
//! 16-byte header:
//!
//! ```text
//! base                                                       end
//! │ [hdr][payload....][hdr][payload..][hdr][payload........] │
//!         ▲ returned address; always 8-aligned
//! ```
//!
//! Policy: first-fit, splitting when the remainder can hold another
//! block, immediate coalescing of free neighbors on release. `realloc`
//! grows in place when the trailing neighbor is free and large enough.
//! Each used block carries its owner task id so that a terminated
//! task's blocks can be reclaimed in one sweep.
//!
//! Allocation failure returns `None`; the pool never panics on OOM.


use crate::memory::Memory;
use crate::types::Addr;

/// Header magic; checked before trusting a block header.
const MAGIC: u16 = 0x52bc;

/// Block flag: the block is allocated.
const FLAG_USED: u16 = 0x0001;

/// Block header size in bytes.
pub const HDR_SIZE: u32 = 16;

/// Payload alignment; also the allocation granularity.
const ALIGN: u32 = 8;

/// Minimum leftover (header + smallest payload) worth splitting off.
const MIN_SPLIT: u32 = HDR_SIZE + ALIGN;

/// Owner tag for blocks that belong to the runtime rather than a task.
pub const OWNER_SYSTEM: u8 = 0xff;

/// One block header, stored in pool memory immediately before the
/// payload it describes.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
struct BlockHdr {
    magic: u16,
    flags: u16,
    /// Total block size including this header.
    size: u32,
    /// Total size of the physically previous block; 0 for the first.
    prev_size: u32,
    /// Owner task id, or `OWNER_SYSTEM`.
    owner: u8,
    _pad: [u8; 3],
}

/// Usage summary returned by [`Pool::statistics`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolStats {
    /// Total managed bytes (headers included).
    pub total: u32,
    /// Bytes in used blocks (headers included).
    pub used: u32,
    /// Bytes in free blocks (headers included).
    pub free: u32,
    /// Number of free blocks (fragmentation indicator).
    pub frag_count: u32,
}

/// Fixed-pool allocator bookkeeping.
///
/// The block headers themselves live in pool memory; this struct only
/// remembers the managed region, so it can be held alongside the
/// `Memory` implementation without borrowing it.
pub struct Pool {
    base: Addr,
    size: u32,
}

impl Pool {
    /// Initialize a pool over `size` bytes starting at `base`,
    /// formatting the whole region as one free block.
    ///
    /// Returns `None` when the region cannot hold even one block.
    pub fn new<M: Memory>(mem: &mut M, base: Addr, size: u32) -> Option<Self> {
        let size = size & !(ALIGN - 1);
        if size < MIN_SPLIT {
            return None;
        }
        write_hdr(
            mem,
            base,
            BlockHdr {
                magic: MAGIC,
                flags: 0,
                size,
                prev_size: 0,
                owner: OWNER_SYSTEM,
                _pad: [0; 3],
            },
        );
        Some(Self { base, size })
    }

    /// End of the managed region (exclusive).
    #[inline]
    #[must_use]
    const fn end(&self) -> Addr {
        self.base.add(self.size)
    }

    /// Allocate `size` payload bytes for `owner`.
    ///
    /// Returns the payload address, or `None` when no free block fits.
    pub fn alloc<M: Memory>(&mut self, mem: &mut M, size: u32, owner: u8) -> Option<Addr> {
        let need = HDR_SIZE + round_up(size.max(1));

        // First fit: walk the physical block chain.
        let mut at = self.base;
        while at.as_u32() < self.end().as_u32() {
            let hdr: BlockHdr = mem.read(at);
            debug_assert_eq!(hdr.magic, MAGIC, "corrupted pool header");
            if hdr.magic != MAGIC || hdr.size == 0 {
                return None;
            }
            if hdr.flags & FLAG_USED == 0 && hdr.size >= need {
                self.take_block(mem, at, hdr, need, owner);
                return Some(at.add(HDR_SIZE));
            }
            at = at.add(hdr.size);
        }
        None
    }

    /// Release the block whose payload starts at `payload`.
    ///
    /// Freeing null is a no-op. A header that fails the magic check is
    /// left untouched (double free or stray pointer).
    pub fn free<M: Memory>(&mut self, mem: &mut M, payload: Addr) {
        if payload.is_null() {
            return;
        }
        let at = payload.sub(HDR_SIZE);
        let hdr: BlockHdr = mem.read(at);
        if hdr.magic != MAGIC || hdr.flags & FLAG_USED == 0 {
            debug_assert!(false, "bad free at {payload:?}");
            return;
        }
        self.release_block(mem, at, hdr);
    }

    /// Resize the block at `payload` to hold `new_size` payload bytes.
    ///
    /// Grows in place when the trailing neighbor is free and large
    /// enough; otherwise allocates a new block, copies the old payload,
    /// and frees the old block. Returns the (possibly moved) payload
    /// address, or `None` on OOM (the original block stays valid).
    pub fn realloc<M: Memory>(&mut self, mem: &mut M, payload: Addr, new_size: u32) -> Option<Addr> {
        let at = payload.sub(HDR_SIZE);
        let mut hdr: BlockHdr = mem.read(at);
        if hdr.magic != MAGIC || hdr.flags & FLAG_USED == 0 {
            debug_assert!(false, "bad realloc at {payload:?}");
            return None;
        }
        let need = HDR_SIZE + round_up(new_size.max(1));

        if need <= hdr.size {
            // Shrink: split off the tail when it is worth a block.
            if hdr.size - need >= MIN_SPLIT {
                self.split_block(mem, at, &mut hdr, need);
                write_hdr(mem, at, hdr);
            }
            return Some(payload);
        }

        // Grow in place by absorbing a free trailing neighbor.
        let next_at = at.add(hdr.size);
        if next_at.as_u32() < self.end().as_u32() {
            let next: BlockHdr = mem.read(next_at);
            if next.flags & FLAG_USED == 0 && hdr.size + next.size >= need {
                hdr.size += next.size;
                self.fix_prev_of_next(mem, at, hdr.size);
                if hdr.size - need >= MIN_SPLIT {
                    self.split_block(mem, at, &mut hdr, need);
                }
                write_hdr(mem, at, hdr);
                return Some(payload);
            }
        }

        // Move: allocate, copy, free.
        let new_payload = self.alloc(mem, new_size, hdr.owner)?;
        let old_cap = hdr.size - HDR_SIZE;
        mem.copy_within(payload, new_payload, old_cap.min(new_size) as usize);
        self.release_block(mem, at, mem.read(at));
        Some(new_payload)
    }

    /// Release every block owned by `owner`.
    pub fn free_all_owned<M: Memory>(&mut self, mem: &mut M, owner: u8) {
        loop {
            let mut at = self.base;
            let mut found = Addr::null();
            while at.as_u32() < self.end().as_u32() {
                let hdr: BlockHdr = mem.read(at);
                if hdr.flags & FLAG_USED != 0 && hdr.owner == owner {
                    found = at.add(HDR_SIZE);
                    break;
                }
                at = at.add(hdr.size);
            }
            if found.is_null() {
                return;
            }
            // Coalescing invalidates the walk; restart after each free.
            self.free(mem, found);
        }
    }

    /// Walk the block chain and summarize usage.
    #[must_use]
    pub fn statistics<M: Memory>(&self, mem: &M) -> PoolStats {
        let mut stats = PoolStats {
            total: self.size,
            used: 0,
            free: 0,
            frag_count: 0,
        };
        let mut at = self.base;
        while at.as_u32() < self.end().as_u32() {
            let hdr: BlockHdr = mem.read(at);
            if hdr.magic != MAGIC || hdr.size == 0 {
                debug_assert!(false, "corrupted pool header");
                break;
            }
            if hdr.flags & FLAG_USED != 0 {
                stats.used += hdr.size;
            } else {
                stats.free += hdr.size;
                stats.frag_count += 1;
            }
            at = at.add(hdr.size);
        }
        stats
    }

    /// Owner tag of the block at `payload`.
    #[must_use]
    pub fn owner_of<M: Memory>(&self, mem: &M, payload: Addr) -> u8 {
        let hdr: BlockHdr = mem.read(payload.sub(HDR_SIZE));
        hdr.owner
    }

    // --- internals ---

    /// Mark a free block used, splitting off the remainder when large
    /// enough.
    fn take_block<M: Memory>(
        &mut self,
        mem: &mut M,
        at: Addr,
        mut hdr: BlockHdr,
        need: u32,
        owner: u8,
    ) {
        if hdr.size - need >= MIN_SPLIT {
            self.split_block(mem, at, &mut hdr, need);
        }
        hdr.flags |= FLAG_USED;
        hdr.owner = owner;
        write_hdr(mem, at, hdr);
    }

    /// Split `hdr` (size updated in place to `keep`) and write a free
    /// block header for the remainder.
    fn split_block<M: Memory>(&mut self, mem: &mut M, at: Addr, hdr: &mut BlockHdr, keep: u32) {
        let rest_at = at.add(keep);
        let rest_size = hdr.size - keep;
        write_hdr(
            mem,
            rest_at,
            BlockHdr {
                magic: MAGIC,
                flags: 0,
                size: rest_size,
                prev_size: keep,
                owner: OWNER_SYSTEM,
                _pad: [0; 3],
            },
        );
        hdr.size = keep;
        self.fix_prev_of_next(mem, rest_at, rest_size);
    }

    /// Free a used block and coalesce with free physical neighbors.
    fn release_block<M: Memory>(&mut self, mem: &mut M, at: Addr, hdr: BlockHdr) {
        let mut at = at;
        let mut size = hdr.size;
        let mut prev_size = hdr.prev_size;

        // Merge the trailing neighbor.
        let next_at = at.add(size);
        if next_at.as_u32() < self.end().as_u32() {
            let next: BlockHdr = mem.read(next_at);
            if next.flags & FLAG_USED == 0 {
                size += next.size;
            }
        }

        // Merge backward into a free predecessor.
        if prev_size > 0 {
            let prev_at = at.sub(prev_size);
            let prev: BlockHdr = mem.read(prev_at);
            if prev.flags & FLAG_USED == 0 {
                at = prev_at;
                size += prev.size;
                prev_size = prev.prev_size;
            }
        }

        write_hdr(
            mem,
            at,
            BlockHdr {
                magic: MAGIC,
                flags: 0,
                size,
                prev_size,
                owner: OWNER_SYSTEM,
                _pad: [0; 3],
            },
        );
        self.fix_prev_of_next(mem, at, size);
    }

    /// Keep the following block's `prev_size` in sync after a resize.
    fn fix_prev_of_next<M: Memory>(&self, mem: &mut M, at: Addr, size: u32) {
        let next_at = at.add(size);
        if next_at.as_u32() < self.end().as_u32() {
            let mut next: BlockHdr = mem.read(next_at);
            next.prev_size = size;
            write_hdr(mem, next_at, next);
        }
    }
}

#[inline]
const fn round_up(n: u32) -> u32 {
    (n + (ALIGN - 1)) & !(ALIGN - 1)
}

#[inline]
fn write_hdr<M: Memory>(mem: &mut M, at: Addr, hdr: BlockHdr) {
    mem.write(at, hdr);
}
