// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Register and call-frame discipline.
//!
//! Every mutation of a register slot releases the previous occupant
//! first; values moved out of a slot leave `Empty` behind so nothing is
//! released twice. Frame pop clears the callee window before restoring
//! the caller, and exception unwind walks catch handlers innermost
//! first, popping frames until one matches.

use super::{Env, VmErr};
use crate::console::Console;
use crate::loader::Irep;
use crate::memory::Memory;
use crate::platform::Platform;
use crate::task::{MAX_REGS, Task};
use crate::value::{self, Value};

/// Store `v` (owned) into window slot `a`, releasing the old occupant.
pub fn set_reg<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    a: u8,
    v: Value,
) {
    let abs = task.base as usize + a as usize;
    set_reg_abs(task, env, abs, v);
}

/// Absolute-index variant of [`set_reg`].
pub fn set_reg_abs<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    v: Value,
) {
    debug_assert!(abs < MAX_REGS);
    let old = core::mem::replace(&mut task.regs[abs], v);
    value::decref(env.pool, env.mem, old);
}

/// Move a value out of a slot, leaving `Empty`.
pub fn take_reg(task: &mut Task, abs: usize) -> Value {
    core::mem::replace(&mut task.regs[abs], Value::Empty)
}

/// Release every slot of the window `[from, from + len)`.
pub fn clear_window<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    from: usize,
    len: usize,
) {
    for abs in from..(from + len).min(MAX_REGS) {
        let old = core::mem::replace(&mut task.regs[abs], Value::Empty);
        value::decref(env.pool, env.mem, old);
    }
}

/// Release the task's whole register stack (task teardown).
pub fn clear_all_regs<M: Memory>(pool: &mut crate::pool::Pool, mem: &mut M, task: &mut Task) {
    for abs in 0..MAX_REGS {
        let old = core::mem::replace(&mut task.regs[abs], Value::Empty);
        value::decref(pool, mem, old);
    }
    let exc = core::mem::replace(&mut task.exc, Value::Nil);
    value::decref(pool, mem, exc);
    let caught = core::mem::replace(&mut task.caught, Value::Nil);
    value::decref(pool, mem, caught);
}

/// Set the pending exception (owned), releasing any previous one.
pub fn set_exc<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    exc: Value,
) {
    let old = core::mem::replace(&mut task.exc, exc);
    value::decref(env.pool, env.mem, old);
}

/// Convert a [`VmErr`] into a pending language exception.
pub fn raise_err<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    err: VmErr,
) {
    let b = &env.classes.builtin;
    let class = match err {
        VmErr::NoMemory => b.no_memory_error,
        VmErr::Type(_) => b.type_error,
        VmErr::Argument(_) => b.argument_error,
        VmErr::ZeroDivision => b.zero_division_error,
        VmErr::Index(_) => b.index_error,
        VmErr::Name(_) => b.name_error,
        VmErr::NoMethod(_) => b.no_method_error,
        VmErr::StackOverflow | VmErr::Internal(_) => b.runtime_error,
    };

    let message = match err {
        VmErr::NoMethod(sym) => {
            let v = value::string_new(env.pool, env.mem, task.id, b"undefined method '");
            if let Some(Value::String(addr)) = v {
                let name_ok = {
                    // The name bytes live in never-freed memory; copy
                    // through a small buffer to keep borrows disjoint.
                    let mut buf = [0u8; 64];
                    let len = env.syms.name(env.mem, sym).map_or(0, |n| {
                        let len = n.len().min(64);
                        buf[..len].copy_from_slice(&n.as_bytes()[..len]);
                        len
                    });
                    value::string_append_bytes(env.pool, env.mem, addr, &buf[..len]).is_some()
                };
                if name_ok {
                    let _ = value::string_append_bytes(env.pool, env.mem, addr, b"'");
                }
                v.unwrap_or(Value::Nil)
            } else {
                Value::Nil
            }
        }
        VmErr::NoMemory => Value::Nil,
        other => {
            let mut buf = [0u8; 96];
            let text = display_into(&mut buf, &other);
            value::string_new(env.pool, env.mem, task.id, text).unwrap_or(Value::Nil)
        }
    };

    let exc = value::exception_new(env.pool, env.mem, task.id, class, message)
        .unwrap_or(Value::Nil);
    set_exc(task, env, exc);
}

/// Unwind one step: jump to a matching catch handler or pop a frame.
///
/// Returns false when the frame chain is empty and the task must die
/// with the exception pending.
pub fn unwind<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
) -> bool {
    loop {
        let ir = Irep::at(env.mem, task.irep);
        // The pc sits just past the faulting instruction; handler
        // ranges are matched half-open on that convention.
        let probe = task.pc;
        let mut found = None;
        for n in (0..ir.h.clen as usize).rev() {
            if let Some(h) = ir.catch_handler(env.mem, n) {
                if h.kind == ruvi_rite::container::catch_type::RESCUE
                    && h.begin < probe
                    && probe <= h.end
                {
                    found = Some(h.target);
                    break;
                }
            }
        }
        if let Some(target) = found {
            task.pc = target;
            let exc = core::mem::replace(&mut task.exc, Value::Nil);
            let old = core::mem::replace(&mut task.caught, exc);
            value::decref(env.pool, env.mem, old);
            return true;
        }

        // No handler here: pop into the caller and retry.
        let Some(ci) = task.pop_ci() else {
            return false;
        };
        let span = (ir.h.nregs as usize).max(ci.n_args as usize + 2);
        let base = task.base as usize;
        clear_window(task, env, base, span);
        task.irep = ci.caller_irep;
        task.pc = ci.caller_pc;
        task.base = ci.caller_base;
    }
}

/// The class that owns class-variable and `super` lookups right now.
pub fn current_class<M: Memory, C: Console, P: Platform>(
    task: &Task,
    env: &Env<'_, M, C, P>,
) -> crate::types::Addr {
    let cls = task
        .current_ci()
        .map_or(crate::types::Addr::null(), |ci| ci.own_class);
    if cls.is_null() {
        env.classes.builtin.object
    } else {
        cls
    }
}

/// Render a `Display` into a byte buffer, truncating silently.
fn display_into<'b, T: core::fmt::Display>(buf: &'b mut [u8; 96], v: &T) -> &'b [u8] {
    struct W<'a> {
        buf: &'a mut [u8; 96],
        len: usize,
    }
    impl core::fmt::Write for W<'_> {
        fn write_str(&mut self, s: &str) -> core::fmt::Result {
            for &b in s.as_bytes() {
                if self.len < self.buf.len() {
                    self.buf[self.len] = b;
                    self.len += 1;
                }
            }
            Ok(())
        }
    }
    let mut w = W { buf, len: 0 };
    let _ = core::fmt::write(&mut w, format_args!("{v}"));
    let len = w.len;
    &buf[..len]
}
