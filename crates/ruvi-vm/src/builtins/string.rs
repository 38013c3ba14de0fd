// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! String builtins.

use super::arg;
use crate::console::Console;
use crate::memory::Memory;
use crate::platform::Platform;
use crate::task::Task;
use crate::value::{self, Value};
use crate::vm::{BuiltinRet, Env, VmErr};

/// `size`/`length`: byte length.
pub fn size<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
) -> Result<BuiltinRet, VmErr> {
    let addr = receiver(task, abs)?;
    let len = value::string_len(env.mem, addr);
    Ok(BuiltinRet::Value(Value::int(i64::from(len))))
}

/// `to_i`: parse a leading integer, 0 when none.
pub fn to_i<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
) -> Result<BuiltinRet, VmErr> {
    let addr = receiver(task, abs)?;
    let bytes = value::string_bytes(env.mem, addr);
    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    let negative = match bytes.get(i) {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };
    let mut n: i64 = 0;
    while let Some(c) = bytes.get(i) {
        if !c.is_ascii_digit() {
            break;
        }
        n = n.wrapping_mul(10).wrapping_add(i64::from(c - b'0'));
        i += 1;
    }
    let n = if negative { n.wrapping_neg() } else { n };
    Ok(BuiltinRet::Value(Value::int(n)))
}

/// `to_f`: parse a leading float, 0.0 when none.
pub fn to_f<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
) -> Result<BuiltinRet, VmErr> {
    let addr = receiver(task, abs)?;
    let bytes = value::string_bytes(env.mem, addr);
    // Longest prefix that still parses as a float.
    let mut buf = [0u8; 64];
    let mut len = 0;
    for &b in bytes {
        if len >= buf.len() {
            break;
        }
        if b.is_ascii_whitespace() && len == 0 {
            continue;
        }
        if !(b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E')) {
            break;
        }
        buf[len] = b;
        len += 1;
    }
    let x = core::str::from_utf8(&buf[..len])
        .ok()
        .and_then(|s| best_float_prefix(s))
        .unwrap_or(0.0);
    Ok(BuiltinRet::Value(Value::float(x)))
}

/// `<<`: append a string or a character code.
pub fn push<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    if argc < 1 {
        return Err(VmErr::Argument("wrong number of arguments"));
    }
    let dst = receiver(task, abs)?;
    match arg(task, abs, 0) {
        Value::String(src) => {
            value::string_append(env.pool, env.mem, dst, src).ok_or(VmErr::NoMemory)?;
        }
        Value::Int(n) => {
            value::string_append_bytes(env.pool, env.mem, dst, &[n as u8])
                .ok_or(VmErr::NoMemory)?;
        }
        _ => return Err(VmErr::Type("cannot append value to String")),
    }
    let recv = task.regs[abs];
    value::incref(env.mem, recv);
    Ok(BuiltinRet::Value(recv))
}

fn receiver(task: &Task, abs: usize) -> Result<crate::types::Addr, VmErr> {
    match task.regs[abs] {
        Value::String(addr) => Ok(addr),
        _ => Err(VmErr::Type("string receiver required")),
    }
}

/// Parse the longest prefix of `s` that is a valid float.
fn best_float_prefix(s: &str) -> Option<f64> {
    for end in (1..=s.len()).rev() {
        if let Ok(x) = s[..end].parse::<f64>() {
            return Some(x);
        }
    }
    None
}
