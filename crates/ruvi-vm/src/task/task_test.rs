// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Tests for the task structure.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{CallInfo, MAX_CALL_DEPTH, Task, TaskState};
use crate::symbol::SymId;
use crate::types::Addr;
use crate::value::Value;

fn frame(pc: u32) -> CallInfo {
    CallInfo {
        caller_irep: Addr::new(0x40),
        caller_pc: pc,
        caller_base: 0,
        method: SymId::new(1),
        own_class: Addr::null(),
        n_args: 0,
        ctor: false,
    }
}

#[test]
fn new_task_is_ready_at_pc_zero() {
    let t = Task::new(3, Addr::new(0x80));
    assert_eq!(t.id, 3);
    assert_eq!(t.state, TaskState::Ready);
    assert_eq!(t.pc, 0);
    assert_eq!(t.base, 0);
    assert_eq!(t.ci_depth(), 0);
    assert!(!t.exc_pending());
    assert!(t.regs.iter().all(Value::is_empty_slot));
}

#[test]
fn call_frames_push_and_pop_lifo() {
    let mut t = Task::new(0, Addr::new(0x80));
    assert!(t.push_ci(frame(10)));
    assert!(t.push_ci(frame(20)));
    assert_eq!(t.ci_depth(), 2);
    assert_eq!(t.current_ci().unwrap().caller_pc, 20);
    assert_eq!(t.pop_ci().unwrap().caller_pc, 20);
    assert_eq!(t.pop_ci().unwrap().caller_pc, 10);
    assert!(t.pop_ci().is_none());
}

#[test]
fn call_stack_overflow_is_reported() {
    let mut t = Task::new(0, Addr::new(0x80));
    for i in 0..MAX_CALL_DEPTH {
        assert!(t.push_ci(frame(i as u32)));
    }
    assert!(!t.push_ci(frame(999)));
    assert_eq!(t.ci_depth() as usize, MAX_CALL_DEPTH);
}

#[test]
fn set_current_n_args_edits_the_top_frame() {
    let mut t = Task::new(0, Addr::new(0x80));
    t.push_ci(frame(1));
    t.set_current_n_args(3);
    assert_eq!(t.current_ci().unwrap().n_args, 3);
}

#[test]
fn exc_pending_tracks_the_slot() {
    let mut t = Task::new(0, Addr::new(0x80));
    assert!(!t.exc_pending());
    t.exc = Value::Exception(Addr::new(0x100));
    assert!(t.exc_pending());
}
