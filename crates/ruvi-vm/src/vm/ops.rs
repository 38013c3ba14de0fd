// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Opcode implementations beyond simple loads.
//!
//! Calling convention: a SEND at window slot `a` makes `base + a` the
//! callee's window base, so the receiver becomes the callee's `self`,
//! arguments sit at `base + a + 1 ..`, and the return value lands back
//! in the caller's slot `a`.

use super::frames::{clear_window, current_class, set_reg, set_reg_abs, take_reg};
use super::{BuiltinRet, Env, Flow, VmErr};
use crate::builtins;
use crate::class::{self, MethodBody};
use crate::console::Console;
use crate::loader::{Irep, Literal};
use crate::memory::Memory;
use crate::platform::Platform;
use crate::symbol::SymId;
use crate::task::{MAX_REGS, CallInfo, Task};
use crate::types::Addr;
use crate::value::{self, HeapProc, Value};
use ruvi_rite::op;

// --- Literals and variables ---

/// Decode literal `n`; strings materialize fresh on every load.
pub fn load_literal<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    ir: &Irep,
    n: usize,
) -> Result<Value, VmErr> {
    match ir.literal(env.mem, n) {
        Some(Literal::Str { at, len }) => {
            value::string_new_from_pool(env.pool, env.mem, task.id, at, len)
                .ok_or(VmErr::NoMemory)
        }
        Some(Literal::Int(n)) => Ok(Value::int(n)),
        Some(Literal::Float(x)) => Ok(Value::float(x)),
        None => Err(VmErr::Internal("bad literal index")),
    }
}

/// `GETIV`: read an ivar of `self`.
pub fn getiv<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    sym: SymId,
) -> Value {
    match task.regs[task.base as usize] {
        Value::Object(addr) => value::ivar_get(env.mem, addr, sym),
        _ => Value::Nil,
    }
}

/// `SETIV`: write an ivar of `self`.
pub fn setiv<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    sym: SymId,
    a: u8,
) -> Result<(), VmErr> {
    let v = task.regs[task.base as usize + a as usize];
    match task.regs[task.base as usize] {
        Value::Object(addr) => {
            value::incref(env.mem, v);
            value::ivar_set(env.pool, env.mem, addr, sym, v).ok_or(VmErr::NoMemory)
        }
        _ => Err(VmErr::Type("instance variable outside an object")),
    }
}

/// `GETCV`: read a class variable of the current class.
pub fn getcv<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    sym: SymId,
) -> Value {
    let cls = current_class(task, env);
    let kv = class::class_cvars(env.mem, cls);
    match value::kv_get(env.mem, kv, sym) {
        Some(v) => {
            value::incref(env.mem, v);
            v
        }
        None => Value::Nil,
    }
}

/// `SETCV`: write a class variable of the current class.
pub fn setcv<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    sym: SymId,
    a: u8,
) -> Result<(), VmErr> {
    let cls = current_class(task, env);
    let v = task.regs[task.base as usize + a as usize];
    value::incref(env.mem, v);
    let kv = class::class_cvars(env.mem, cls);
    let kv = value::kv_set(env.pool, env.mem, kv, sym, v).ok_or(VmErr::NoMemory)?;
    class::set_class_cvars(env.mem, cls, kv);
    Ok(())
}

// --- Indexing ---

/// `GETIDX`: `R(a) = R(a)[R(a+1)]` for arrays, hashes and strings.
pub fn get_index<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let recv = task.regs[abs];
    let idx = task.regs[abs + 1];
    let result = index_read(task, env, recv, idx)?;
    set_reg_abs(task, env, abs, result);
    Ok(())
}

/// Shared `[]` read; the result is owned by the caller.
pub fn index_read<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    recv: Value,
    idx: Value,
) -> Result<Value, VmErr> {
    match (recv, idx) {
        (Value::Array(addr), Value::Int(n)) => {
            let len = i64::from(value::array_len(env.mem, addr));
            let i = if n < 0 { len + n } else { n };
            if i < 0 || i >= len {
                return Ok(Value::Nil);
            }
            let v = value::array_get(env.mem, addr, i as usize);
            value::incref(env.mem, v);
            Ok(v)
        }
        (Value::Hash(addr), key) => {
            let v = value::hash_get(env.mem, addr, key).unwrap_or(Value::Nil);
            value::incref(env.mem, v);
            Ok(v)
        }
        (Value::String(addr), Value::Int(n)) => {
            let len = i64::from(value::string_len(env.mem, addr));
            let i = if n < 0 { len + n } else { n };
            if i < 0 || i >= len {
                return Ok(Value::Nil);
            }
            let byte = {
                let bytes = value::string_bytes(env.mem, addr);
                bytes[i as usize]
            };
            value::string_new(env.pool, env.mem, task.id, &[byte]).ok_or(VmErr::NoMemory)
        }
        (Value::Array(_) | Value::String(_), _) => Err(VmErr::Type("index must be an Integer")),
        _ => Err(VmErr::Type("receiver does not support []")),
    }
}

/// `SETIDX`: `R(a)[R(a+1)] = R(a+2)` for arrays and hashes.
pub fn set_index<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let recv = task.regs[abs];
    let key = task.regs[abs + 1];
    let val = task.regs[abs + 2];
    index_write(env, recv, key, val)
}

/// Shared `[]=` write; increfs what it stores.
pub fn index_write<M: Memory, C: Console, P: Platform>(
    env: &mut Env<'_, M, C, P>,
    recv: Value,
    key: Value,
    val: Value,
) -> Result<(), VmErr> {
    match (recv, key) {
        (Value::Array(addr), Value::Int(n)) => {
            let len = i64::from(value::array_len(env.mem, addr));
            let i = if n < 0 { len + n } else { n };
            if i < 0 {
                return Err(VmErr::Index("index out of range"));
            }
            value::incref(env.mem, val);
            value::array_set(env.pool, env.mem, addr, i as usize, val).ok_or(VmErr::NoMemory)
        }
        (Value::Hash(addr), key) => {
            value::incref(env.mem, key);
            value::incref(env.mem, val);
            value::hash_set(env.pool, env.mem, addr, key, val).ok_or(VmErr::NoMemory)
        }
        (Value::Array(_), _) => Err(VmErr::Type("index must be an Integer")),
        _ => Err(VmErr::Type("receiver does not support []=")),
    }
}

// --- Exceptions ---

/// `RESCUE`: `R(b) = R(a).kind_of?(R(b))` for rescue clause matching.
pub fn rescue_test<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
    b: u8,
) -> Result<(), VmErr> {
    let exc = task.regs[task.base as usize + a as usize];
    let target = task.regs[task.base as usize + b as usize];
    let Value::Class(target_cls) = target else {
        return Err(VmErr::Type("class required for rescue clause"));
    };
    let exc_cls = env.classes.class_of(env.mem, exc);
    let matched = env.classes.is_kind_of(env.mem, exc_cls, target_cls);
    set_reg(task, env, b, Value::bool(matched));
    Ok(())
}

// --- Calls ---

/// Push a bytecode frame at window `abs` and switch execution into it.
fn enter_frame<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    irep: Addr,
    method: SymId,
    own_class: Addr,
    argc: u8,
    ctor: bool,
) -> Result<(), VmErr> {
    let callee = Irep::at(env.mem, irep);
    let nregs = (callee.h.nregs as usize).max(argc as usize + 2);
    if abs + nregs > MAX_REGS {
        return Err(VmErr::StackOverflow);
    }
    let pushed = task.push_ci(CallInfo {
        caller_irep: task.irep,
        caller_pc: task.pc,
        caller_base: task.base,
        method,
        own_class,
        n_args: argc,
        ctor,
    });
    if !pushed {
        return Err(VmErr::StackOverflow);
    }
    // Locals above the block slot start as nil.
    for i in (argc as usize + 2)..nregs {
        set_reg_abs(task, env, abs + i, Value::Nil);
    }
    task.base = abs as u16;
    task.irep = irep;
    task.pc = 0;
    Ok(())
}

/// Dispatch a resolved method body.
fn dispatch_body<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    sym: SymId,
    argc: u8,
    body: MethodBody,
    found_cls: Addr,
) -> Result<Option<Flow>, VmErr> {
    match body {
        MethodBody::Irep(irep) => {
            enter_frame(task, env, abs, irep, sym, found_cls, argc, false)?;
            Ok(None)
        }
        MethodBody::Builtin(id) => match builtins::call(id, task, env, abs, argc)? {
            BuiltinRet::Value(v) => {
                set_reg_abs(task, env, abs, v);
                Ok(None)
            }
            BuiltinRet::Leave(flow) => {
                if matches!(flow, Flow::Sleep(_) | Flow::Park | Flow::Yield | Flow::SuspendSelf) {
                    set_reg_abs(task, env, abs, Value::Nil);
                }
                Ok(Some(flow))
            }
            BuiltinRet::EnterIrep {
                irep,
                own_class,
                method,
                ctor,
            } => {
                enter_frame(task, env, abs, irep, method, own_class, argc, ctor)?;
                Ok(None)
            }
        },
    }
}

/// `SEND`/`SSEND` and their block-carrying variants.
pub fn op_send<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
    sym: SymId,
    argc: u8,
    has_block: bool,
    self_send: bool,
) -> Result<Option<Flow>, VmErr> {
    let abs = task.base as usize + a as usize;
    if abs + argc as usize + 2 > MAX_REGS {
        return Err(VmErr::StackOverflow);
    }
    if self_send {
        let recv = task.regs[task.base as usize];
        value::incref(env.mem, recv);
        set_reg_abs(task, env, abs, recv);
    }
    if !has_block {
        set_reg_abs(task, env, abs + argc as usize + 1, Value::Nil);
    }

    let recv = task.regs[abs];
    if matches!(recv, Value::Proc(_)) && sym == env.known.call {
        return proc_invoke(task, env, abs, argc);
    }

    let cls = env.classes.class_of(env.mem, recv);
    let Some((body, found_cls)) = env.classes.find_method(env.mem, cls, sym) else {
        return Err(VmErr::NoMethod(sym));
    };
    dispatch_body(task, env, abs, sym, argc, body, found_cls)
}

/// Invoke the Proc at absolute slot `abs` with `argc` arguments.
///
/// The Proc's captured frame supplies `self`, the method identity and
/// `own_class`, so `super` and ivars inside the proc resolve against
/// the creation site.
pub fn proc_invoke<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<Option<Flow>, VmErr> {
    let Value::Proc(paddr) = task.regs[abs] else {
        return Err(VmErr::Type("not callable"));
    };
    if abs + argc as usize + 2 > MAX_REGS {
        return Err(VmErr::StackOverflow);
    }
    set_reg_abs(task, env, abs + argc as usize + 1, Value::Nil);

    let p: HeapProc = env.mem.read(paddr);
    value::incref(env.mem, p.self_val);
    if let Err(e) = enter_frame(
        task,
        env,
        abs,
        p.irep,
        SymId::new(p.method as u16),
        p.own_class,
        argc,
        false,
    ) {
        value::decref(env.pool, env.mem, p.self_val);
        return Err(e);
    }
    // The proc slot becomes the callee's self.
    set_reg_abs(task, env, abs, p.self_val);
    Ok(None)
}

/// `SUPER`: re-dispatch the current method above `own_class`.
pub fn op_super<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
    argc: u8,
) -> Result<Option<Flow>, VmErr> {
    let Some(ci) = task.current_ci().copied() else {
        return Err(VmErr::Internal("super called outside of method"));
    };
    if ci.own_class.is_null() {
        return Err(VmErr::Internal("super called outside of method"));
    }
    let start = class::class_super(env.mem, ci.own_class);
    if start.is_null() {
        return Err(VmErr::NoMethod(ci.method));
    }
    let Some((body, found_cls)) = env.classes.find_method(env.mem, start, ci.method) else {
        return Err(VmErr::NoMethod(ci.method));
    };

    let abs = task.base as usize + a as usize;
    if abs + argc as usize + 2 > MAX_REGS {
        return Err(VmErr::StackOverflow);
    }
    let self_v = task.regs[task.base as usize];
    value::incref(env.mem, self_v);
    set_reg_abs(task, env, abs, self_v);
    set_reg_abs(task, env, abs + argc as usize + 1, Value::Nil);
    dispatch_body(task, env, abs, ci.method, argc, body, found_cls)
}

/// `ENTER`: check the argument count against the arg spec and reshape
/// the window (rest collection, missing optionals, block position).
///
/// Optional-default jump tables are not modeled: missing optionals are
/// nil.
pub fn op_enter<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    w: u32,
) -> Result<(), VmErr> {
    let Some(ci) = task.current_ci() else {
        return Ok(());
    };
    let n = ci.n_args as usize;
    let m1 = op::aspec::required(w) as usize;
    let o = op::aspec::optional(w) as usize;
    let rest = op::aspec::has_rest(w);

    if n < m1 {
        return Err(VmErr::Argument("wrong number of arguments"));
    }
    if !rest && n > m1 + o {
        return Err(VmErr::Argument("wrong number of arguments"));
    }

    let base = task.base as usize;
    let declared = m1 + o + usize::from(rest);
    if base + declared + 2 > MAX_REGS {
        return Err(VmErr::StackOverflow);
    }
    let block = take_reg(task, base + n + 1);

    if rest {
        let fixed = m1 + o;
        let extra = n.saturating_sub(fixed);
        let mut elems = [Value::Empty; 16];
        if extra > 16 {
            value::decref(env.pool, env.mem, block);
            return Err(VmErr::Argument("too many arguments"));
        }
        for (i, e) in elems.iter_mut().enumerate().take(extra) {
            *e = take_reg(task, base + 1 + fixed + i);
        }
        let rest_ary = value::array_new_from(env.pool, env.mem, task.id, &elems[..extra]);
        let Some(rest_ary) = rest_ary else {
            for e in elems.iter().take(extra) {
                value::decref(env.pool, env.mem, *e);
            }
            value::decref(env.pool, env.mem, block);
            return Err(VmErr::NoMemory);
        };
        // Missing optionals become nil.
        for i in n..fixed {
            set_reg_abs(task, env, base + 1 + i, Value::Nil);
        }
        set_reg_abs(task, env, base + 1 + fixed, rest_ary);
    } else {
        for i in n..m1 + o {
            set_reg_abs(task, env, base + 1 + i, Value::Nil);
        }
    }

    set_reg_abs(task, env, base + declared + 1, block);
    task.set_current_n_args(declared as u8);
    Ok(())
}

/// `RETURN` and end-of-stream: pop a frame or finish the task.
pub fn do_return<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: Option<u8>,
) -> Result<Option<Flow>, VmErr> {
    let base = task.base as usize;
    let mut retval = match a {
        Some(a) => take_reg(task, base + a as usize),
        None => Value::Nil,
    };
    let ir = Irep::at(env.mem, task.irep);

    let Some(ci) = task.pop_ci() else {
        value::decref(env.pool, env.mem, retval);
        return Ok(Some(Flow::Done));
    };

    if ci.ctor {
        // Constructor frames yield the instance, not the body's value.
        value::decref(env.pool, env.mem, retval);
        retval = take_reg(task, base);
    }
    // The window spans at least the arguments even when the callee
    // declared fewer registers.
    let span = (ir.h.nregs as usize).max(ci.n_args as usize + 2);
    clear_window(task, env, base, span);
    task.irep = ci.caller_irep;
    task.pc = ci.caller_pc;
    task.base = ci.caller_base;
    // The callee window base is the caller's target slot; it was just
    // cleared, so a direct store transfers ownership.
    task.regs[base] = retval;
    Ok(None)
}

// --- Arithmetic and comparison ---

/// `ADD`/`SUB`/`MUL`/`DIV` on `R(a), R(a+1)`.
pub fn arith<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    opcode: u8,
    a: u8,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let x = task.regs[abs];
    let y = task.regs[abs + 1];
    let result = binary_arith(task, env, opcode, x, y)?;
    set_reg_abs(task, env, abs, result);
    Ok(())
}

/// `ADDI`/`SUBI`: immediate add/subtract.
pub fn arith_imm<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    opcode: u8,
    a: u8,
    b: u8,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let imm = i64::from(b);
    let result = match (task.regs[abs], opcode) {
        (Value::Int(n), op::ADDI) => Value::int(n.wrapping_add(imm)),
        (Value::Int(n), _) => Value::int(n.wrapping_sub(imm)),
        (Value::Float(x), op::ADDI) => Value::float(x + imm as f64),
        (Value::Float(x), _) => Value::float(x - imm as f64),
        _ => return Err(VmErr::Type("arithmetic on non-numeric value")),
    };
    set_reg_abs(task, env, abs, result);
    Ok(())
}

fn binary_arith<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    opcode: u8,
    x: Value,
    y: Value,
) -> Result<Value, VmErr> {
    match (x, y) {
        (Value::Int(a), Value::Int(b)) => Ok(match opcode {
            op::ADD => Value::int(a.wrapping_add(b)),
            op::SUB => Value::int(a.wrapping_sub(b)),
            op::MUL => Value::int(a.wrapping_mul(b)),
            _ => {
                if b == 0 {
                    return Err(VmErr::ZeroDivision);
                }
                Value::int(a.wrapping_div(b))
            }
        }),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let a = as_f64(x);
            let b = as_f64(y);
            Ok(Value::float(match opcode {
                op::ADD => a + b,
                op::SUB => a - b,
                op::MUL => a * b,
                _ => a / b,
            }))
        }
        (Value::String(_), Value::String(ya)) if opcode == op::ADD => {
            let joined = value::dup(env.pool, env.mem, task.id, x).ok_or(VmErr::NoMemory)?;
            let Value::String(ja) = joined else {
                return Err(VmErr::NoMemory);
            };
            value::string_append(env.pool, env.mem, ja, ya).ok_or(VmErr::NoMemory)?;
            Ok(joined)
        }
        (Value::Array(xa), Value::Array(ya)) if opcode == op::ADD => {
            let xlen = value::array_len(env.mem, xa) as usize;
            let ylen = value::array_len(env.mem, ya) as usize;
            let joined = value::array_new(env.pool, env.mem, task.id, (xlen + ylen).max(1) as u16)
                .ok_or(VmErr::NoMemory)?;
            let Value::Array(ja) = joined else {
                return Err(VmErr::NoMemory);
            };
            for i in 0..xlen + ylen {
                let e = if i < xlen {
                    value::array_get(env.mem, xa, i)
                } else {
                    value::array_get(env.mem, ya, i - xlen)
                };
                value::incref(env.mem, e);
                value::array_push(env.pool, env.mem, ja, e).ok_or(VmErr::NoMemory)?;
            }
            Ok(joined)
        }
        _ => Err(VmErr::Type("arithmetic on incompatible values")),
    }
}

/// `EQ`/`LT`/`LE`/`GT`/`GE` on `R(a), R(a+1)`.
pub fn compare_op<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    opcode: u8,
    a: u8,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let x = task.regs[abs];
    let y = task.regs[abs + 1];
    if opcode != op::EQ {
        let orderable = (x.is_numeric() && y.is_numeric())
            || (matches!(x, Value::String(_)) && matches!(y, Value::String(_)));
        if !orderable {
            return Err(VmErr::Type("comparison of incompatible values"));
        }
    }
    let c = value::compare(env.mem, x, y);
    let result = match opcode {
        op::EQ => c == 0,
        op::LT => c < 0,
        op::LE => c <= 0,
        op::GT => c > 0,
        _ => c >= 0,
    };
    set_reg_abs(task, env, abs, Value::bool(result));
    Ok(())
}

// --- Builders ---

/// `ARRAY`/`ARRAY2`: collect registers into a fresh array.
///
/// `consume` moves the source slots (ARRAY); otherwise they are kept
/// live and incref'd (ARRAY2).
pub fn build_array<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
    src: u8,
    count: u8,
    consume: bool,
) -> Result<(), VmErr> {
    let base = task.base as usize;
    let src_abs = base + src as usize;
    let mut elems = [Value::Empty; 256];
    for i in 0..count as usize {
        if consume {
            elems[i] = take_reg(task, src_abs + i);
        } else {
            let v = task.regs[src_abs + i];
            value::incref(env.mem, v);
            elems[i] = v;
        }
    }
    match value::array_new_from(env.pool, env.mem, task.id, &elems[..count as usize]) {
        Some(ary) => {
            set_reg_abs(task, env, base + a as usize, ary);
            Ok(())
        }
        None => {
            for e in elems.iter().take(count as usize) {
                value::decref(env.pool, env.mem, *e);
            }
            Err(VmErr::NoMemory)
        }
    }
}

/// `ARYPUSH`: `R(a).push(R(a+1))`, consuming the pushed slot.
pub fn ary_push<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let Value::Array(addr) = task.regs[abs] else {
        return Err(VmErr::Type("push on non-array"));
    };
    let v = take_reg(task, abs + 1);
    match value::array_push(env.pool, env.mem, addr, v) {
        Some(()) => Ok(()),
        None => {
            value::decref(env.pool, env.mem, v);
            Err(VmErr::NoMemory)
        }
    }
}

/// `INTERN`: `R(a) = R(a).to_sym`.
pub fn intern_string<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let Value::String(addr) = task.regs[abs] else {
        return Err(VmErr::Type("to_sym on non-string"));
    };
    let mut buf = [0u8; 64];
    let len = {
        let bytes = value::string_bytes(env.mem, addr);
        if bytes.len() > buf.len() {
            return Err(VmErr::Name("symbol name too long"));
        }
        buf[..bytes.len()].copy_from_slice(bytes);
        bytes.len()
    };
    let sym = env
        .syms
        .intern_bytes(env.pool, env.mem, &buf[..len])
        .ok_or(VmErr::Name("symbol table exhausted"))?;
    set_reg_abs(task, env, abs, Value::symbol(sym));
    Ok(())
}

/// `STRCAT`: append `R(a+1)` to the string in `R(a)`.
///
/// Strings append bytes; an integer appends one character (its low
/// byte); anything else is a type error.
pub fn strcat<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let Value::String(dst) = task.regs[abs] else {
        return Err(VmErr::Type("append to non-string"));
    };
    match task.regs[abs + 1] {
        Value::String(src) => {
            value::string_append(env.pool, env.mem, dst, src).ok_or(VmErr::NoMemory)?;
        }
        Value::Int(n) => {
            value::string_append_bytes(env.pool, env.mem, dst, &[n as u8])
                .ok_or(VmErr::NoMemory)?;
        }
        _ => return Err(VmErr::Type("cannot append value to String")),
    }
    set_reg_abs(task, env, abs + 1, Value::Empty);
    Ok(())
}

/// `HASH`: build from `b` key/value pairs starting at `R(a)`.
pub fn build_hash<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
    pairs: u8,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let hash = value::hash_new(env.pool, env.mem, task.id, pairs.max(1) as u16)
        .ok_or(VmErr::NoMemory)?;
    let Value::Hash(haddr) = hash else {
        return Err(VmErr::NoMemory);
    };
    for i in 0..pairs as usize {
        let k = take_reg(task, abs + 2 * i);
        let v = take_reg(task, abs + 2 * i + 1);
        if value::hash_set(env.pool, env.mem, haddr, k, v).is_none() {
            value::decref(env.pool, env.mem, k);
            value::decref(env.pool, env.mem, v);
            value::decref(env.pool, env.mem, hash);
            return Err(VmErr::NoMemory);
        }
    }
    task.regs[abs] = hash;
    Ok(())
}

/// `LAMBDA`/`BLOCK`/`METHOD`: make a Proc from a child IREP.
pub fn make_proc<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    ir: &Irep,
    opcode: u8,
    a: u8,
    b: u8,
) -> Result<(), VmErr> {
    let child = ir.child(env.mem, b as usize);
    let proc_v = if opcode == op::METHOD {
        value::proc_new(
            env.pool,
            env.mem,
            task.id,
            child,
            Value::Nil,
            SymId::new(0),
            Addr::null(),
        )
    } else {
        // Capture the creation frame: self, method, own_class.
        let self_v = task.regs[task.base as usize];
        value::incref(env.mem, self_v);
        let (method, own_class) = task
            .current_ci()
            .map_or((SymId::new(0), Addr::null()), |ci| {
                (ci.method, ci.own_class)
            });
        value::proc_new(env.pool, env.mem, task.id, child, self_v, method, own_class)
    };
    let proc_v = proc_v.ok_or(VmErr::NoMemory)?;
    set_reg(task, env, a, proc_v);
    Ok(())
}

/// `RANGE_INC`/`RANGE_EXC`: `R(a) = R(a) .. R(a+1)`.
pub fn build_range<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
    exclusive: bool,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let first = take_reg(task, abs);
    let last = take_reg(task, abs + 1);
    match value::range_new(env.pool, env.mem, task.id, first, last, exclusive) {
        Some(range) => {
            task.regs[abs] = range;
            Ok(())
        }
        None => {
            value::decref(env.pool, env.mem, first);
            value::decref(env.pool, env.mem, last);
            Err(VmErr::NoMemory)
        }
    }
}

// --- Class definition ---

/// `CLASS`: define (or reopen) class `sym` with superclass `R(a+1)`.
pub fn def_class<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
    sym: SymId,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let superclass = match task.regs[abs + 1] {
        Value::Class(addr) => addr,
        Value::Nil | Value::Empty => Addr::null(),
        _ => return Err(VmErr::Type("superclass must be a Class")),
    };
    let cls = env
        .classes
        .define_class(env.pool, env.mem, sym, superclass)
        .ok_or(VmErr::NoMemory)?;
    // Classes are also constants, so GETCONST finds them.
    *env.consts = value::kv_set(env.pool, env.mem, *env.consts, sym, Value::Class(cls))
        .ok_or(VmErr::NoMemory)?;
    set_reg_abs(task, env, abs, Value::Class(cls));
    Ok(())
}

/// `EXEC`: run a class body IREP with `self` = the class.
pub fn exec_class_body<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
    child: Addr,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let Value::Class(cls) = task.regs[abs] else {
        return Err(VmErr::Type("class body without a class"));
    };
    set_reg_abs(task, env, abs + 1, Value::Nil);
    enter_frame(task, env, abs, child, SymId::new(0), cls, 0, false)
}

/// `DEF`: bind the method Proc in `R(a+1)` to class `R(a)`.
pub fn def_method<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
    sym: SymId,
) -> Result<(), VmErr> {
    let abs = task.base as usize + a as usize;
    let Value::Class(cls) = task.regs[abs] else {
        return Err(VmErr::Type("method definition outside a class"));
    };
    let Value::Proc(paddr) = task.regs[abs + 1] else {
        return Err(VmErr::Type("method body must be a Proc"));
    };
    let p: HeapProc = env.mem.read(paddr);
    env.classes
        .define_method(env.pool, env.mem, cls, sym, MethodBody::Irep(p.irep))
        .ok_or(VmErr::NoMemory)?;
    set_reg_abs(task, env, abs + 1, Value::Empty);
    set_reg_abs(task, env, abs, Value::symbol(sym));
    Ok(())
}

fn as_f64(v: Value) -> f64 {
    match v {
        Value::Int(n) => n as f64,
        Value::Float(x) => x,
        _ => 0.0,
    }
}
