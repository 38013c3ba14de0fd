// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Array, hash and range builtins. Indexing is shared with the
//! `GETIDX`/`SETIDX` opcodes.

use super::{arg, bid};
use crate::console::Console;
use crate::memory::Memory;
use crate::platform::Platform;
use crate::task::Task;
use crate::value::{self, HeapRange, Value};
use crate::vm::ops::{index_read, index_write};
use crate::vm::{BuiltinRet, Env, VmErr};

/// `[]` for arrays, hashes and strings.
pub fn idx_get<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    if argc < 1 {
        return Err(VmErr::Argument("wrong number of arguments"));
    }
    let recv = task.regs[abs];
    let idx = arg(task, abs, 0);
    let v = index_read(task, env, recv, idx)?;
    Ok(BuiltinRet::Value(v))
}

/// `[]=` for arrays and hashes; returns the stored value.
pub fn idx_set<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    if argc < 2 {
        return Err(VmErr::Argument("wrong number of arguments"));
    }
    let recv = task.regs[abs];
    let key = arg(task, abs, 0);
    let val = arg(task, abs, 1);
    index_write(env, recv, key, val)?;
    value::incref(env.mem, val);
    Ok(BuiltinRet::Value(val))
}

/// `size`/`pop`/`first`/`last` on arrays.
pub fn array_op<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    id: u16,
) -> Result<BuiltinRet, VmErr> {
    let Value::Array(addr) = task.regs[abs] else {
        return Err(VmErr::Type("array receiver required"));
    };
    let len = value::array_len(env.mem, addr) as usize;
    let v = match id {
        bid::ARR_SIZE => Value::int(len as i64),
        bid::ARR_POP => value::array_pop(env.mem, addr).unwrap_or(Value::Nil),
        bid::ARR_FIRST | bid::ARR_LAST => {
            if len == 0 {
                Value::Nil
            } else {
                let i = if id == bid::ARR_FIRST { 0 } else { len - 1 };
                let e = value::array_get(env.mem, addr, i);
                value::incref(env.mem, e);
                e
            }
        }
        _ => return Err(VmErr::Internal("unknown builtin id")),
    };
    Ok(BuiltinRet::Value(v))
}

/// `push`/`<<` on arrays; returns the array.
pub fn array_push<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    if argc < 1 {
        return Err(VmErr::Argument("wrong number of arguments"));
    }
    let Value::Array(addr) = task.regs[abs] else {
        return Err(VmErr::Type("array receiver required"));
    };
    for n in 0..argc as usize {
        let v = arg(task, abs, n);
        value::incref(env.mem, v);
        if value::array_push(env.pool, env.mem, addr, v).is_none() {
            value::decref(env.pool, env.mem, v);
            return Err(VmErr::NoMemory);
        }
    }
    let recv = task.regs[abs];
    value::incref(env.mem, recv);
    Ok(BuiltinRet::Value(recv))
}

/// `size`/`key?` on hashes.
pub fn hash_op<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
    id: u16,
) -> Result<BuiltinRet, VmErr> {
    let Value::Hash(addr) = task.regs[abs] else {
        return Err(VmErr::Type("hash receiver required"));
    };
    let v = match id {
        bid::HASH_SIZE => Value::int(i64::from(value::hash_len(env.mem, addr))),
        _ => {
            if argc < 1 {
                return Err(VmErr::Argument("wrong number of arguments"));
            }
            let key = arg(task, abs, 0);
            Value::bool(value::hash_get(env.mem, addr, key).is_some())
        }
    };
    Ok(BuiltinRet::Value(v))
}

/// `first`/`last`/`exclude_end?` on ranges.
pub fn range_op<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    id: u16,
) -> Result<BuiltinRet, VmErr> {
    let Value::Range(addr) = task.regs[abs] else {
        return Err(VmErr::Type("range receiver required"));
    };
    let r: HeapRange = env.mem.read(addr);
    let v = match id {
        bid::RANGE_FIRST => {
            value::incref(env.mem, r.first);
            r.first
        }
        bid::RANGE_LAST => {
            value::incref(env.mem, r.last);
            r.last
        }
        _ => Value::bool(r.exclusive != 0),
    };
    Ok(BuiltinRet::Value(v))
}
