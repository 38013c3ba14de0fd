// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! The runtime façade: what an embedding host talks to.
//!
//! A [`Runtime`] owns the pool, the symbol and class tables, the task
//! slots and the scheduler, plus the host-supplied memory, console and
//! platform. The host API is three calls:
//!
//! ```text
//! let mut rt = Runtime::new(mem, console, platform)?;   // init
//! rt.create_task(&bytecode, None)?;                     // load + spawn
//! let clean = rt.run();                                 // drive to completion
//! ```


mod bootstrap;

use crate::class::ClassTable;
use crate::console::Console;
use crate::loader::{self, LoadError};
use crate::memory::Memory;
use crate::platform::Platform;
use crate::pool::{OWNER_SYSTEM, Pool, PoolStats};
use crate::symbol::{KnownSyms, SymbolTable};
use crate::task::sched::Slots;
use crate::task::{Effect, Effects, Scheduler, Task, TaskState};
use crate::types::Addr;
use crate::value::{self, HeapException, Value};
use crate::vm::{Env, Flow, Vm, clear_all_regs};
use core::fmt;

/// Initialization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// The caller's buffer cannot hold even the bootstrap state.
    PoolTooSmall,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PoolTooSmall => write!(f, "memory pool too small"),
        }
    }
}

/// Task creation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    /// The bytecode image was rejected.
    Load(LoadError),
    /// All task slots are in use.
    NoFreeTask,
    /// Pool exhaustion while setting the task up.
    OutOfMemory,
}

impl fmt::Display for SpawnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(e) => write!(f, "{e}"),
            Self::NoFreeTask => write!(f, "no free task slot"),
            Self::OutOfMemory => write!(f, "out of pool memory"),
        }
    }
}

impl From<LoadError> for SpawnError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

/// An embeddable RITE bytecode virtual machine.
pub struct Runtime<M, C, P> {
    mem: M,
    con: C,
    plat: P,
    pool: Pool,
    syms: SymbolTable,
    classes: ClassTable,
    known: KnownSyms,
    globals: Addr,
    consts: Addr,
    tasks: Slots,
    sched: Scheduler,
}

impl<M: Memory, C: Console, P: Platform> Runtime<M, C, P> {
    /// Initialize the runtime inside the caller-supplied memory.
    pub fn new(mut mem: M, con: C, plat: P) -> Result<Self, InitError> {
        let size = mem.size() as u32;
        let mut pool = Pool::new(&mut mem, Addr::null(), size).ok_or(InitError::PoolTooSmall)?;
        let mut syms = SymbolTable::new();
        let known = KnownSyms::intern(&mut syms, &mem).ok_or(InitError::PoolTooSmall)?;
        let mut classes = ClassTable::new();

        let globals =
            value::kv_new(&mut pool, &mut mem, OWNER_SYSTEM, 4).ok_or(InitError::PoolTooSmall)?;
        let consts =
            value::kv_new(&mut pool, &mut mem, OWNER_SYSTEM, 32).ok_or(InitError::PoolTooSmall)?;
        let consts = bootstrap::install(&mut pool, &mut syms, &mut classes, &mut mem, consts)
            .ok_or(InitError::PoolTooSmall)?;

        Ok(Self {
            mem,
            con,
            plat,
            pool,
            syms,
            classes,
            known,
            globals,
            consts,
            tasks: core::array::from_fn(|_| None),
            sched: Scheduler::new(),
        })
    }

    /// Parse a bytecode image, allocate a task for it, and queue it.
    pub fn create_task(&mut self, image: &[u8], name: Option<&str>) -> Result<u8, SpawnError> {
        let irep = loader::load(&mut self.pool, &mut self.syms, &mut self.mem, image)?;

        let Some(slot) = self.tasks.iter().position(Option::is_none) else {
            loader::free_irep(&mut self.pool, &mut self.mem, irep);
            return Err(SpawnError::NoFreeTask);
        };
        let id = slot as u8;

        let mut task = Task::new(id, irep);
        // Top-level self is a plain object whose class is Object.
        let Some(main) =
            value::instance_new(&mut self.pool, &mut self.mem, id, self.classes.builtin.object)
        else {
            loader::free_irep(&mut self.pool, &mut self.mem, irep);
            return Err(SpawnError::OutOfMemory);
        };
        task.regs[0] = main;
        if let Some(name) = name {
            task.name = self
                .syms
                .intern_bytes(&mut self.pool, &mut self.mem, name.as_bytes());
        }

        self.tasks[slot] = Some(task);
        self.sched.enqueue_ready(&mut self.tasks, id);
        Ok(id)
    }

    /// Drive the scheduler until every task is dormant.
    ///
    /// Returns true on a clean exit: no uncaught exception and no task
    /// left permanently stuck.
    pub fn run(&mut self) -> bool {
        let mut clean = true;
        loop {
            let now = self.plat.tick();
            self.sched.wake_expired(&mut self.tasks, now);

            let Some(id) = self.sched.take_ready(&mut self.tasks) else {
                if self.sched.all_dormant(&self.tasks) {
                    break;
                }
                if !self.sched.has_waiting() {
                    // Only suspended tasks remain; nothing can progress.
                    clean = false;
                    break;
                }
                self.plat.idle();
                continue;
            };

            let Some(mut task) = self.tasks[id as usize].take() else {
                continue;
            };
            let mut fx = Effects::new();
            let flow = {
                let mut env = Env {
                    pool: &mut self.pool,
                    syms: &mut self.syms,
                    classes: &mut self.classes,
                    known: &self.known,
                    globals: &mut self.globals,
                    consts: &mut self.consts,
                    mem: &mut self.mem,
                    con: &mut self.con,
                    plat: &mut self.plat,
                    fx: &mut fx,
                };
                Vm::run(&mut task, &mut env)
            };
            self.tasks[id as usize] = Some(task);

            match flow {
                Flow::Done => self.finish_task(id),
                Flow::Dead => {
                    clean = false;
                    self.report_exception(id);
                    self.finish_task(id);
                }
                Flow::Yield => self.sched.enqueue_ready(&mut self.tasks, id),
                Flow::Sleep(ticks) => {
                    let wakeup = self.plat.tick().wrapping_add(ticks);
                    self.sched.enqueue_waiting(&mut self.tasks, id, wakeup);
                }
                Flow::Park | Flow::Block => self.sched.park(&mut self.tasks, id),
                Flow::SuspendSelf => self.sched.enqueue_suspended(&mut self.tasks, id),
                Flow::TerminateSelf => self.terminate_task(id),
            }

            for effect in fx.drain() {
                self.apply_effect(effect);
            }
        }
        clean && self.sched.all_dormant(&self.tasks)
    }

    /// Current pool usage.
    #[must_use]
    pub fn pool_statistics(&self) -> PoolStats {
        self.pool.statistics(&self.mem)
    }

    /// The console, for hosts that capture output.
    pub const fn console(&self) -> &C {
        &self.con
    }

    /// Mutable console access.
    pub const fn console_mut(&mut self) -> &mut C {
        &mut self.con
    }

    /// State of a task slot, if occupied.
    #[must_use]
    pub fn task_state(&self, id: u8) -> Option<TaskState> {
        self.tasks.get(id as usize)?.as_ref().map(|t| t.state)
    }

    // --- internals ---

    /// Normal task end: release its values, keep it dormant.
    fn finish_task(&mut self, id: u8) {
        if let Some(task) = self.tasks[id as usize].as_mut() {
            clear_all_regs(&mut self.pool, &mut self.mem, task);
        }
        self.sched.enqueue_dormant(&mut self.tasks, id);
    }

    /// Forced task end: additionally sweep every pool block the task
    /// still owns (leaked cycles included).
    fn terminate_task(&mut self, id: u8) {
        self.sched.remove(&mut self.tasks, id);
        if let Some(task) = self.tasks[id as usize].as_mut() {
            clear_all_regs(&mut self.pool, &mut self.mem, task);
        }
        self.pool.free_all_owned(&mut self.mem, id);
        self.sched.enqueue_dormant(&mut self.tasks, id);
    }

    fn apply_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Wake(id) => self.sched.wake(&mut self.tasks, id),
            Effect::Suspend(id) => {
                if self.task_state(id).is_some_and(|s| s != TaskState::Dormant) {
                    self.sched.remove(&mut self.tasks, id);
                    self.sched.enqueue_suspended(&mut self.tasks, id);
                }
            }
            Effect::Resume(id) => {
                if self.task_state(id) == Some(TaskState::Suspended) {
                    self.sched.remove(&mut self.tasks, id);
                    self.sched.enqueue_ready(&mut self.tasks, id);
                }
            }
            Effect::Terminate(id) => {
                if self.task_state(id).is_some_and(|s| s != TaskState::Dormant) {
                    self.terminate_task(id);
                }
            }
        }
    }

    /// One diagnostic line for an uncaught exception.
    fn report_exception(&mut self, id: u8) {
        let Some(task) = self.tasks[id as usize].as_ref() else {
            return;
        };
        let Value::Exception(addr) = task.exc else {
            return;
        };
        let exc: HeapException = self.mem.read(addr);
        let name = crate::class::class_name(&self.mem, exc.class);
        let name = self.syms.name(&self.mem, name).unwrap_or("Exception");
        self.con.write_str(name);
        if let Value::String(msg) = exc.message {
            self.con.write_str(": ");
            let len = value::string_len(&self.mem, msg) as usize;
            for i in 0..len {
                let b = value::string_bytes(&self.mem, msg)[i];
                self.con.put(b);
            }
        }
        self.con.put(b'\n');
    }
}
