// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Built-in methods.
//!
//! Native method bodies dispatch through a fixed id table: a method
//! entry stores a [`bid`] constant and `call` matches on it. The
//! calling convention mirrors bytecode methods: the receiver sits at
//! the absolute window slot `abs`, arguments at `abs + 1 ..= abs +
//! argc`, the block (or nil) one above the arguments. A builtin
//! returns its result value, a scheduling decision, or a bytecode
//! frame to enter (the constructor path).

#[cfg(test)]
mod builtins_test;

mod collection;
mod object;
mod string;
mod task_ops;

use crate::console::Console;
use crate::memory::Memory;
use crate::platform::Platform;
use crate::task::Task;
use crate::value::Value;
use crate::vm::{BuiltinRet, Env, VmErr};

/// Builtin dispatch ids.
pub mod bid {
    // Object / Kernel
    pub const OBJ_PUTS: u16 = 0;
    pub const OBJ_PRINT: u16 = 1;
    pub const OBJ_P: u16 = 2;
    pub const OBJ_PRINTF: u16 = 3;
    pub const OBJ_SPRINTF: u16 = 4;
    pub const OBJ_RAISE: u16 = 5;
    pub const OBJ_NEW: u16 = 6;
    pub const OBJ_DUP: u16 = 7;
    pub const OBJ_CLASS: u16 = 8;
    pub const OBJ_OBJECT_ID: u16 = 9;
    pub const OBJ_KIND_OF: u16 = 10;
    pub const OBJ_BLOCK_GIVEN: u16 = 11;
    pub const OBJ_TO_S: u16 = 12;
    pub const OBJ_INSPECT: u16 = 13;
    pub const OBJ_INITIALIZE: u16 = 14;
    pub const OBJ_NOT_EQ: u16 = 15;
    pub const OBJ_EQ: u16 = 16;

    // Numerics
    pub const NUM_TO_I: u16 = 20;
    pub const NUM_TO_F: u16 = 21;
    pub const NUM_ABS: u16 = 22;

    // String
    pub const STR_SIZE: u16 = 30;
    pub const STR_TO_I: u16 = 31;
    pub const STR_TO_F: u16 = 32;
    pub const STR_PUSH: u16 = 33;

    // Shared indexing
    pub const IDX_GET: u16 = 40;
    pub const IDX_SET: u16 = 41;

    // Array
    pub const ARR_SIZE: u16 = 50;
    pub const ARR_PUSH: u16 = 51;
    pub const ARR_POP: u16 = 52;
    pub const ARR_FIRST: u16 = 53;
    pub const ARR_LAST: u16 = 54;

    // Hash
    pub const HASH_SIZE: u16 = 60;
    pub const HASH_HAS_KEY: u16 = 61;

    // Range
    pub const RANGE_FIRST: u16 = 70;
    pub const RANGE_LAST: u16 = 71;
    pub const RANGE_EXCLUDE_END: u16 = 72;

    // Exception
    pub const EXC_MESSAGE: u16 = 80;

    // Task
    pub const TASK_CURRENT: u16 = 90;
    pub const TASK_PASS: u16 = 91;
    pub const TASK_SUSPEND: u16 = 92;
    pub const TASK_RESUME: u16 = 93;
    pub const TASK_TERMINATE: u16 = 94;

    // Mutex
    pub const MUTEX_LOCK: u16 = 100;
    pub const MUTEX_UNLOCK: u16 = 101;
    pub const MUTEX_TRY_LOCK: u16 = 102;
    pub const MUTEX_LOCKED: u16 = 103;

    // Kernel timing
    pub const KERNEL_SLEEP: u16 = 110;
    pub const KERNEL_SLEEP_MS: u16 = 111;
}

/// Execute builtin `id` with the receiver at absolute slot `abs`.
pub fn call<M: Memory, C: Console, P: Platform>(
    id: u16,
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    match id {
        bid::OBJ_PUTS => object::puts(task, env, abs, argc),
        bid::OBJ_PRINT => object::print(task, env, abs, argc),
        bid::OBJ_P => object::p(task, env, abs, argc),
        bid::OBJ_PRINTF => object::printf(task, env, abs, argc),
        bid::OBJ_SPRINTF => object::sprintf(task, env, abs, argc),
        bid::OBJ_RAISE => object::raise(task, env, abs, argc),
        bid::OBJ_NEW => object::new(task, env, abs, argc),
        bid::OBJ_DUP => object::dup(task, env, abs),
        bid::OBJ_CLASS => object::class(task, env, abs),
        bid::OBJ_OBJECT_ID => object::object_id(task, env, abs),
        bid::OBJ_KIND_OF => object::kind_of(task, env, abs, argc),
        bid::OBJ_BLOCK_GIVEN => object::block_given(task, env, abs),
        bid::OBJ_TO_S => object::to_s(task, env, abs),
        bid::OBJ_INSPECT => object::inspect(task, env, abs),
        bid::OBJ_INITIALIZE => Ok(BuiltinRet::Value(Value::Nil)),
        bid::OBJ_EQ | bid::OBJ_NOT_EQ => object::eq(task, env, abs, id == bid::OBJ_NOT_EQ),

        bid::NUM_TO_I | bid::NUM_TO_F | bid::NUM_ABS => object::numeric(task, env, abs, id),

        bid::STR_SIZE => string::size(task, env, abs),
        bid::STR_TO_I => string::to_i(task, env, abs),
        bid::STR_TO_F => string::to_f(task, env, abs),
        bid::STR_PUSH => string::push(task, env, abs, argc),

        bid::IDX_GET => collection::idx_get(task, env, abs, argc),
        bid::IDX_SET => collection::idx_set(task, env, abs, argc),

        bid::ARR_SIZE | bid::ARR_POP | bid::ARR_FIRST | bid::ARR_LAST => {
            collection::array_op(task, env, abs, id)
        }
        bid::ARR_PUSH => collection::array_push(task, env, abs, argc),

        bid::HASH_SIZE | bid::HASH_HAS_KEY => collection::hash_op(task, env, abs, argc, id),

        bid::RANGE_FIRST | bid::RANGE_LAST | bid::RANGE_EXCLUDE_END => {
            collection::range_op(task, env, abs, id)
        }

        bid::EXC_MESSAGE => object::exc_message(task, env, abs),

        bid::TASK_CURRENT
        | bid::TASK_PASS
        | bid::TASK_SUSPEND
        | bid::TASK_RESUME
        | bid::TASK_TERMINATE => task_ops::task_op(task, env, abs, argc, id),

        bid::MUTEX_LOCK | bid::MUTEX_UNLOCK | bid::MUTEX_TRY_LOCK | bid::MUTEX_LOCKED => {
            task_ops::mutex_op(task, env, abs, id)
        }

        bid::KERNEL_SLEEP => task_ops::sleep(task, env, abs, argc, false),
        bid::KERNEL_SLEEP_MS => task_ops::sleep(task, env, abs, argc, true),

        _ => Err(VmErr::Internal("unknown builtin id")),
    }
}

/// The `n`th argument (1-based slot above the receiver).
fn arg(task: &Task, abs: usize, n: usize) -> Value {
    task.regs[abs + 1 + n]
}
