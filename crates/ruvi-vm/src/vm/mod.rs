// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Bytecode interpreter.
//!
//! A register VM: the task owns the register stack, each call occupies
//! a contiguous window inside it, and the dispatch loop reads one
//! instruction at a time from the current IREP. All shared runtime
//! state reaches the loop through [`Env`], so the interpreter itself is
//! stateless.
//!
//! Operands are decoded and the program counter advanced before an
//! instruction executes; an exception therefore always unwinds from
//! the position just past the faulting instruction, and catch-handler
//! ranges are matched on that convention.
//!
//! The loop leaves in exactly these ways: the top-level returns
//! ([`Flow::Done`]), the task blocks or sleeps, the timeslice expires,
//! or an exception unwinds past the last frame ([`Flow::Dead`]).

#[cfg(test)]
mod vm_test;

pub(crate) mod frames;
pub(crate) mod ops;

pub use frames::clear_all_regs;

use crate::class::ClassTable;
use crate::console::Console;
use crate::loader::Irep;
use crate::memory::Memory;
use crate::platform::Platform;
use crate::pool::Pool;
use crate::symbol::{KnownSyms, SymId, SymbolTable};
use crate::task::{Effects, Task};
use crate::types::Addr;
use crate::value::Value;
use core::fmt;
use ruvi_rite::{insn::Fetch, op};

/// Instructions executed between timeslice polls.
pub const POLL_INTERVAL: u32 = 10;

/// Execution environment threaded through the interpreter: everything
/// shared between tasks.
pub struct Env<'e, M, C, P> {
    pub pool: &'e mut Pool,
    pub syms: &'e mut SymbolTable,
    pub classes: &'e mut ClassTable,
    pub known: &'e KnownSyms,
    /// Global variable store (kv block; moves on growth).
    pub globals: &'e mut Addr,
    /// Constant store (kv block; moves on growth).
    pub consts: &'e mut Addr,
    pub mem: &'e mut M,
    pub con: &'e mut C,
    pub plat: &'e mut P,
    pub fx: &'e mut Effects,
}

/// Why the dispatch loop returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Top-level code finished normally.
    Done,
    /// Timeslice expired or the task passed; still runnable.
    Yield,
    /// Sleep for the given number of ticks.
    Sleep(u32),
    /// Sleep with no wakeup (explicit wake only).
    Park,
    /// Blocked on a mutex; the mutex waiter list holds the task.
    Block,
    /// The task suspended itself.
    SuspendSelf,
    /// The task terminated itself.
    TerminateSelf,
    /// An exception unwound past the last frame; `task.exc` holds it.
    Dead,
}

/// Language-level error raised into the running task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VmErr {
    /// Pool allocation failed.
    NoMemory,
    /// Operand or receiver of the wrong type.
    Type(&'static str),
    /// Bad argument count or value.
    Argument(&'static str),
    /// Integer division by zero.
    ZeroDivision,
    /// Index out of range.
    Index(&'static str),
    /// Unknown constant or symbol-table overflow.
    Name(&'static str),
    /// Method lookup failed.
    NoMethod(SymId),
    /// Register or call-stack overflow.
    StackOverflow,
    /// Malformed or unsupported bytecode.
    Internal(&'static str),
}

impl fmt::Display for VmErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMemory => write!(f, "out of memory"),
            Self::Type(m) | Self::Argument(m) | Self::Index(m) | Self::Name(m)
            | Self::Internal(m) => write!(f, "{m}"),
            Self::ZeroDivision => write!(f, "divided by 0"),
            Self::NoMethod(_) => write!(f, "undefined method"),
            Self::StackOverflow => write!(f, "stack level too deep"),
        }
    }
}

/// What a builtin method produced.
pub enum BuiltinRet {
    /// A result value (owned); the interpreter stores it in the target
    /// slot.
    Value(Value),
    /// Leave the dispatch loop; the target slot is left untouched.
    Leave(Flow),
    /// Enter a bytecode frame the builtin prepared (constructor path).
    EnterIrep {
        irep: Addr,
        own_class: Addr,
        method: SymId,
        ctor: bool,
    },
}

/// Decoded operands of one instruction.
#[derive(Clone, Copy, Default)]
struct Operands {
    a: u8,
    b: u8,
    c: u8,
    s: u16,
    w: u32,
    ss: u32,
}

/// Stateless dispatch engine.
pub struct Vm;

impl Vm {
    /// Run `task` until it completes, blocks, or exhausts its slice.
    pub fn run<M: Memory, C: Console, P: Platform>(
        task: &mut Task,
        env: &mut Env<'_, M, C, P>,
    ) -> Flow {
        let deadline = env.plat.tick().wrapping_add(task.timeslice);
        let mut until_poll = POLL_INTERVAL;

        loop {
            if task.exc_pending() {
                if frames::unwind(task, env) {
                    continue;
                }
                return Flow::Dead;
            }

            match Self::step(task, env) {
                Ok(None) => {}
                Ok(Some(flow)) => return flow,
                Err(e) => frames::raise_err(task, env, e),
            }

            until_poll -= 1;
            if until_poll == 0 {
                until_poll = POLL_INTERVAL;
                let now = env.plat.tick();
                if now.wrapping_sub(deadline) < u32::MAX / 2 {
                    return Flow::Yield;
                }
            }
        }
    }

    /// Execute one instruction.
    #[expect(clippy::too_many_lines, reason = "one arm per opcode")]
    fn step<M: Memory, C: Console, P: Platform>(
        task: &mut Task,
        env: &mut Env<'_, M, C, P>,
    ) -> Result<Option<Flow>, VmErr> {
        let ir = Irep::at(env.mem, task.irep);
        if task.pc >= u32::from(ir.h.ilen) {
            // Fell off the end of the stream: implicit nil return.
            return ops::do_return(task, env, None);
        }

        // Copy the instruction out so the dispatch arms can borrow the
        // environment freely, then advance the pc past it.
        let insn_at = task.pc as usize;
        let avail = (ir.h.ilen as usize - insn_at).min(8);
        let mut bytes = [0u8; 8];
        bytes[..avail].copy_from_slice(&ir.code(env.mem)[insn_at..insn_at + avail]);
        let mut f = Fetch::new(&bytes[..avail], 0);
        let opcode = f.b();
        let fmt = op::format(opcode);

        let mut o = Operands::default();
        match fmt {
            op::Fmt::Z => {}
            op::Fmt::B => o.a = f.b(),
            op::Fmt::BB => {
                o.a = f.b();
                o.b = f.b();
            }
            op::Fmt::BBB => {
                o.a = f.b();
                o.b = f.b();
                o.c = f.b();
            }
            op::Fmt::BS => {
                o.a = f.b();
                o.s = f.s();
            }
            op::Fmt::BSS => {
                o.a = f.b();
                o.ss = f.ss();
            }
            op::Fmt::S => o.s = f.s(),
            op::Fmt::W => o.w = f.w(),
        }
        task.pc = (insn_at + 1 + fmt.operand_len()) as u32;

        let (a, b, c) = (o.a, o.b, o.c);
        match opcode {
            op::NOP => {}

            op::MOVE => {
                let v = task.regs[task.base as usize + b as usize];
                crate::value::incref(env.mem, v);
                frames::set_reg(task, env, a, v);
            }

            op::LOADL => {
                let v = ops::load_literal(task, env, &ir, b as usize)?;
                frames::set_reg(task, env, a, v);
            }

            op::LOADI => frames::set_reg(task, env, a, Value::int(i64::from(b))),
            op::LOADINEG => frames::set_reg(task, env, a, Value::int(-i64::from(b))),

            op::LOADI__1..=op::LOADI_7 => {
                let n = i64::from(opcode) - i64::from(op::LOADI_0);
                frames::set_reg(task, env, a, Value::int(n));
            }

            op::LOADI16 => frames::set_reg(task, env, a, Value::int(i64::from(o.s as i16))),
            op::LOADI32 => frames::set_reg(task, env, a, Value::int(i64::from(o.ss as i32))),

            op::LOADSYM | op::SYMBOL => {
                let sym = ir.sym(env.mem, b as usize);
                frames::set_reg(task, env, a, Value::symbol(sym));
            }

            op::LOADNIL => frames::set_reg(task, env, a, Value::Nil),

            op::LOADSELF => {
                let v = task.regs[task.base as usize];
                crate::value::incref(env.mem, v);
                frames::set_reg(task, env, a, v);
            }

            op::LOADT => frames::set_reg(task, env, a, Value::bool(true)),
            op::LOADF => frames::set_reg(task, env, a, Value::bool(false)),

            op::GETGV => {
                let sym = ir.sym(env.mem, b as usize);
                let v = crate::value::kv_get(env.mem, *env.globals, sym).unwrap_or(Value::Nil);
                crate::value::incref(env.mem, v);
                frames::set_reg(task, env, a, v);
            }

            op::SETGV => {
                let sym = ir.sym(env.mem, b as usize);
                let v = task.regs[task.base as usize + a as usize];
                crate::value::incref(env.mem, v);
                *env.globals = crate::value::kv_set(env.pool, env.mem, *env.globals, sym, v)
                    .ok_or(VmErr::NoMemory)?;
            }

            op::GETIV => {
                let sym = ir.sym(env.mem, b as usize);
                let v = ops::getiv(task, env, sym);
                frames::set_reg(task, env, a, v);
            }

            op::SETIV => {
                let sym = ir.sym(env.mem, b as usize);
                ops::setiv(task, env, sym, a)?;
            }

            op::GETCV => {
                let sym = ir.sym(env.mem, b as usize);
                let v = ops::getcv(task, env, sym);
                frames::set_reg(task, env, a, v);
            }

            op::SETCV => {
                let sym = ir.sym(env.mem, b as usize);
                ops::setcv(task, env, sym, a)?;
            }

            op::GETCONST => {
                let sym = ir.sym(env.mem, b as usize);
                let v = crate::value::kv_get(env.mem, *env.consts, sym)
                    .ok_or(VmErr::Name("uninitialized constant"))?;
                crate::value::incref(env.mem, v);
                frames::set_reg(task, env, a, v);
            }

            op::SETCONST => {
                let sym = ir.sym(env.mem, b as usize);
                let v = task.regs[task.base as usize + a as usize];
                crate::value::incref(env.mem, v);
                *env.consts = crate::value::kv_set(env.pool, env.mem, *env.consts, sym, v)
                    .ok_or(VmErr::NoMemory)?;
            }

            op::GETIDX => ops::get_index(task, env, a)?,
            op::SETIDX => ops::set_index(task, env, a)?,

            op::JMP | op::JMPUW => task.pc = jump(task.pc, o.s as i16),

            op::JMPIF | op::JMPNOT | op::JMPNIL => {
                let v = task.regs[task.base as usize + a as usize];
                let taken = match opcode {
                    op::JMPIF => v.is_truthy(),
                    op::JMPNOT => !v.is_truthy(),
                    _ => v.is_nil(),
                };
                if taken {
                    task.pc = jump(task.pc, o.s as i16);
                }
            }

            op::EXCEPT => {
                let v = core::mem::replace(&mut task.caught, Value::Nil);
                frames::set_reg(task, env, a, v);
            }

            op::RESCUE => ops::rescue_test(task, env, a, b)?,

            op::RAISEIF => {
                let v = task.regs[task.base as usize + a as usize];
                if !v.is_nil() && !v.is_empty_slot() {
                    crate::value::incref(env.mem, v);
                    frames::set_exc(task, env, v);
                }
            }

            op::SSEND | op::SSENDB | op::SEND | op::SENDB => {
                let sym = ir.sym(env.mem, b as usize);
                let has_block = matches!(opcode, op::SSENDB | op::SENDB);
                let self_send = matches!(opcode, op::SSEND | op::SSENDB);
                return ops::op_send(task, env, a, sym, c, has_block, self_send);
            }

            op::CALL => {
                let abs = task.base as usize + a as usize;
                return ops::proc_invoke(task, env, abs, b);
            }

            op::SUPER => return ops::op_super(task, env, a, b),

            op::ENTER => ops::op_enter(task, env, o.w)?,

            op::RETURN | op::RETURN_BLK | op::BREAK => {
                return ops::do_return(task, env, Some(a));
            }

            op::ADD | op::SUB | op::MUL | op::DIV => ops::arith(task, env, opcode, a)?,
            op::ADDI | op::SUBI => ops::arith_imm(task, env, opcode, a, b)?,
            op::EQ | op::LT | op::LE | op::GT | op::GE => ops::compare_op(task, env, opcode, a)?,

            op::ARRAY => ops::build_array(task, env, a, a, b, true)?,
            op::ARRAY2 => ops::build_array(task, env, a, b, c, false)?,
            op::ARYPUSH => ops::ary_push(task, env, a)?,

            op::ARYDUP => {
                let abs = task.base as usize + a as usize;
                let v = crate::value::dup(env.pool, env.mem, task.id, task.regs[abs])
                    .ok_or(VmErr::NoMemory)?;
                frames::set_reg(task, env, a, v);
            }

            op::INTERN => ops::intern_string(task, env, a)?,

            op::STRING => {
                let v = ops::load_literal(task, env, &ir, b as usize)?;
                frames::set_reg(task, env, a, v);
            }

            op::STRCAT => ops::strcat(task, env, a)?,
            op::HASH => ops::build_hash(task, env, a, b)?,

            op::LAMBDA | op::BLOCK | op::METHOD => ops::make_proc(task, env, &ir, opcode, a, b)?,

            op::RANGE_INC | op::RANGE_EXC => {
                ops::build_range(task, env, a, opcode == op::RANGE_EXC)?;
            }

            op::OCLASS => {
                let object = env.classes.builtin.object;
                frames::set_reg(task, env, a, Value::Class(object));
            }

            op::CLASS => {
                let sym = ir.sym(env.mem, b as usize);
                ops::def_class(task, env, a, sym)?;
            }

            op::EXEC => {
                let child = ir.child(env.mem, b as usize);
                ops::exec_class_body(task, env, a, child)?;
            }

            op::DEF => {
                let sym = ir.sym(env.mem, b as usize);
                ops::def_method(task, env, a, sym)?;
            }

            op::TCLASS => {
                let cls = frames::current_class(task, env);
                frames::set_reg(task, env, a, Value::Class(cls));
            }

            op::DEBUG => {}

            op::ERR => return Err(VmErr::Internal("compile-time error")),

            op::STOP | op::ABORT => return Ok(Some(Flow::Done)),

            _ => return Err(VmErr::Internal("unsupported opcode")),
        }

        Ok(None)
    }
}

/// Relative jump from the byte after the offset operand.
fn jump(after: u32, s: i16) -> u32 {
    after.wrapping_add(s as u32)
}
