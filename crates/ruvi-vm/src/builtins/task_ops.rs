// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Scheduling builtins: `sleep`, task control and mutexes.
//!
//! Operations on *other* tasks are recorded as effects and applied by
//! the runtime between slices, so they take effect at the target's
//! next scheduling point. Operations on the current task leave the
//! dispatch loop through a [`Flow`].

use super::{arg, bid};
use crate::console::Console;
use crate::memory::Memory;
use crate::platform::Platform;
use crate::task::{Effect, Task, TICKS_PER_SEC};
use crate::value::{self, HeapMutex, HeapTaskRef, Value, handle_kind, handle_kind_of};
use crate::vm::{BuiltinRet, Env, Flow, VmErr};

/// `sleep`/`sleep_ms`.
///
/// `sleep` with no argument parks the task until an explicit wake;
/// otherwise the argument is seconds (integer or float) or, for
/// `sleep_ms`, milliseconds.
pub fn sleep<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
    millis: bool,
) -> Result<BuiltinRet, VmErr> {
    let _ = env;
    if argc == 0 {
        return Ok(BuiltinRet::Leave(Flow::Park));
    }
    let ticks = match arg(task, abs, 0) {
        Value::Int(n) if n >= 0 => {
            if millis {
                n as u32
            } else {
                (n as u32).saturating_mul(TICKS_PER_SEC)
            }
        }
        Value::Float(x) if x >= 0.0 && !millis => (x * f64::from(TICKS_PER_SEC)) as u32,
        _ => return Err(VmErr::Type("sleep duration must be a non-negative number")),
    };
    if ticks == 0 {
        return Ok(BuiltinRet::Leave(Flow::Yield));
    }
    Ok(BuiltinRet::Leave(Flow::Sleep(ticks)))
}

/// `Task.current`, `Task.pass`, `Task.suspend`, `Task.resume`,
/// `Task.terminate`.
pub fn task_op<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
    id: u16,
) -> Result<BuiltinRet, VmErr> {
    match id {
        bid::TASK_CURRENT => {
            let h = value::task_ref_new(env.pool, env.mem, task.id, task.id)
                .ok_or(VmErr::NoMemory)?;
            Ok(BuiltinRet::Value(h))
        }
        bid::TASK_PASS => Ok(BuiltinRet::Leave(Flow::Yield)),
        bid::TASK_SUSPEND => other_or_self(task, env, abs, argc, Effect::Suspend, Flow::SuspendSelf),
        bid::TASK_RESUME => {
            let target = target_task(task, env, abs, argc)?
                .ok_or(VmErr::Argument("task handle required"))?;
            env.fx.push(Effect::Resume(target));
            Ok(BuiltinRet::Value(Value::Nil))
        }
        _ => other_or_self(task, env, abs, argc, Effect::Terminate, Flow::TerminateSelf),
    }
}

/// Suspend/terminate either the handle argument or the current task.
fn other_or_self<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
    make: fn(u8) -> Effect,
    own: Flow,
) -> Result<BuiltinRet, VmErr> {
    match target_task(task, env, abs, argc)? {
        Some(target) if target != task.id => {
            env.fx.push(make(target));
            Ok(BuiltinRet::Value(Value::Nil))
        }
        _ => Ok(BuiltinRet::Leave(own)),
    }
}

/// Decode an optional task-handle argument.
fn target_task<M: Memory, C: Console, P: Platform>(
    task: &Task,
    env: &Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<Option<u8>, VmErr> {
    if argc == 0 {
        return Ok(None);
    }
    let Value::Handle(addr) = arg(task, abs, 0) else {
        return Err(VmErr::Type("task handle required"));
    };
    if handle_kind_of(env.mem, addr) != handle_kind::TASK {
        return Err(VmErr::Type("task handle required"));
    }
    let h: HeapTaskRef = env.mem.read(addr);
    Ok(Some(h.task))
}

/// `lock`/`unlock`/`try_lock`/`locked?`.
pub fn mutex_op<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    id: u16,
) -> Result<BuiltinRet, VmErr> {
    let Value::Handle(addr) = task.regs[abs] else {
        return Err(VmErr::Type("mutex receiver required"));
    };
    if handle_kind_of(env.mem, addr) != handle_kind::MUTEX {
        return Err(VmErr::Type("mutex receiver required"));
    }
    let mut m: HeapMutex = env.mem.read(addr);

    match id {
        bid::MUTEX_LOCK => {
            if m.locked == 0 {
                m.locked = 1;
                m.owner = task.id;
                env.mem.write(addr, m);
                let recv = task.regs[abs];
                value::incref(env.mem, recv);
                return Ok(BuiltinRet::Value(recv));
            }
            if m.owner == task.id {
                return Err(VmErr::Internal("deadlock; recursively locking"));
            }
            if m.wq_len as usize >= m.wq.len() {
                return Err(VmErr::Internal("too many mutex waiters"));
            }
            m.wq[m.wq_len as usize] = task.id;
            m.wq_len += 1;
            env.mem.write(addr, m);
            Ok(BuiltinRet::Leave(Flow::Block))
        }
        bid::MUTEX_UNLOCK => {
            if m.locked == 0 || m.owner != task.id {
                return Err(VmErr::Internal("mutex not locked by this task"));
            }
            if m.wq_len > 0 {
                // Hand the lock straight to the head waiter.
                let next = m.wq[0];
                for i in 1..m.wq_len as usize {
                    m.wq[i - 1] = m.wq[i];
                }
                m.wq_len -= 1;
                m.owner = next;
                env.fx.push(Effect::Wake(next));
            } else {
                m.locked = 0;
            }
            env.mem.write(addr, m);
            let recv = task.regs[abs];
            value::incref(env.mem, recv);
            Ok(BuiltinRet::Value(recv))
        }
        bid::MUTEX_TRY_LOCK => {
            if m.locked == 0 {
                m.locked = 1;
                m.owner = task.id;
                env.mem.write(addr, m);
                Ok(BuiltinRet::Value(Value::bool(true)))
            } else {
                Ok(BuiltinRet::Value(Value::bool(false)))
            }
        }
        _ => Ok(BuiltinRet::Value(Value::bool(m.locked != 0))),
    }
}
