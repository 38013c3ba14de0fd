// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Cooperative scheduler.
//!
//! Tasks move between four intrusive queues chained through
//! `Task::next`:
//!
//! ```text
//! DORMANT → READY → RUNNING → (WAITING | SUSPENDED | DORMANT)
//!              ▲______________________│
//! ```
//!
//! The ready queue is kept sorted by priority (ascending number) with
//! FIFO order inside one priority, so selection is "pop head" and a
//! task whose slice expired re-enters behind its peers — round-robin
//! among equals. The waiting queue is sorted by wakeup tick.

use super::{MAX_TASKS, NO_TASK, Task, TaskState};

/// Task storage: one fixed slot per task id.
pub type Slots = [Option<Task>; MAX_TASKS];

/// Cross-task operations requested while another task is running.
///
/// Suspend/resume/terminate of *another* task only take effect at the
/// target's next scheduling point; the interpreter records them here
/// and the runtime applies them between slices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Move a task blocked on a mutex back to ready.
    Wake(u8),
    /// Suspend a task.
    Suspend(u8),
    /// Resume a suspended task.
    Resume(u8),
    /// Terminate a task, releasing its resources.
    Terminate(u8),
}

/// Bounded queue of pending effects.
pub struct Effects {
    items: [Option<Effect>; Effects::CAP],
    len: usize,
}

impl Effects {
    const CAP: usize = 16;

    /// An empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            items: [None; Self::CAP],
            len: 0,
        }
    }

    /// Record an effect; silently drops past capacity (the queue is
    /// drained every slice, so capacity bounds one slice's requests).
    pub const fn push(&mut self, effect: Effect) {
        if self.len < Self::CAP {
            self.items[self.len] = Some(effect);
            self.len += 1;
        }
    }

    /// Take the queued effects, leaving the queue empty.
    pub fn drain(&mut self) -> impl Iterator<Item = Effect> {
        let len = self.len;
        self.len = 0;
        let mut items = [None; Self::CAP];
        core::mem::swap(&mut items, &mut self.items);
        items.into_iter().take(len).flatten()
    }
}

impl Default for Effects {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue heads for the four task states.
pub struct Scheduler {
    ready: u8,
    waiting: u8,
    suspended: u8,
    dormant: u8,
}

impl Scheduler {
    /// A scheduler with all queues empty.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ready: NO_TASK,
            waiting: NO_TASK,
            suspended: NO_TASK,
            dormant: NO_TASK,
        }
    }

    /// The next task to run: head of the ready queue.
    #[must_use]
    pub const fn peek_ready(&self) -> Option<u8> {
        if self.ready == NO_TASK {
            None
        } else {
            Some(self.ready)
        }
    }

    /// Whether any task is waiting on a wakeup tick.
    #[must_use]
    pub const fn has_waiting(&self) -> bool {
        self.waiting != NO_TASK
    }

    /// Pop the ready head and mark it running.
    pub fn take_ready(&mut self, tasks: &mut Slots) -> Option<u8> {
        let id = self.peek_ready()?;
        self.ready = next_of(tasks, id);
        set_next(tasks, id, NO_TASK);
        set_state(tasks, id, TaskState::Running);
        Some(id)
    }

    /// Queue a task as ready, behind its priority group.
    pub fn enqueue_ready(&mut self, tasks: &mut Slots, id: u8) {
        set_state(tasks, id, TaskState::Ready);
        let my_prio = prio_of(tasks, id);
        let head = self.ready;
        self.ready = insert_into(tasks, head, id, |tasks, other| {
            prio_of(tasks, other) <= my_prio
        });
    }

    /// Queue a task as waiting until `wakeup`.
    pub fn enqueue_waiting(&mut self, tasks: &mut Slots, id: u8, wakeup: u32) {
        set_state(tasks, id, TaskState::Waiting);
        if let Some(t) = tasks[id as usize].as_mut() {
            t.wakeup = wakeup;
        }
        let mine = wakeup;
        let head = self.waiting;
        self.waiting = insert_into(tasks, head, id, |tasks, other| {
            wakeup_of(tasks, other) <= mine
        });
    }

    /// Queue a task as waiting with no wakeup (mutex block, endless
    /// sleep); only an explicit wake moves it on.
    pub fn park(&mut self, tasks: &mut Slots, id: u8) {
        set_state(tasks, id, TaskState::Waiting);
        if let Some(t) = tasks[id as usize].as_mut() {
            t.wakeup = u32::MAX;
        }
        let head = self.waiting;
        self.waiting = insert_into(tasks, head, id, |_, _| true);
    }

    /// Queue a task as suspended.
    pub fn enqueue_suspended(&mut self, tasks: &mut Slots, id: u8) {
        set_state(tasks, id, TaskState::Suspended);
        let head = self.suspended;
        self.suspended = insert_into(tasks, head, id, |_, _| true);
    }

    /// Queue a task as dormant (terminated).
    pub fn enqueue_dormant(&mut self, tasks: &mut Slots, id: u8) {
        set_state(tasks, id, TaskState::Dormant);
        let head = self.dormant;
        self.dormant = insert_into(tasks, head, id, |_, _| true);
    }

    /// Remove `id` from whatever queue currently holds it.
    pub fn remove(&mut self, tasks: &mut Slots, id: u8) {
        for head in [
            &mut self.ready,
            &mut self.waiting,
            &mut self.suspended,
            &mut self.dormant,
        ] {
            if remove_from(tasks, head, id) {
                return;
            }
        }
    }

    /// Whether `id` currently sits in the waiting queue.
    #[must_use]
    pub fn is_waiting(&self, tasks: &Slots, id: u8) -> bool {
        let mut at = self.waiting;
        while at != NO_TASK {
            if at == id {
                return true;
            }
            at = next_of(tasks, at);
        }
        false
    }

    /// Move every waiting task whose wakeup tick has passed to ready.
    pub fn wake_expired(&mut self, tasks: &mut Slots, now: u32) {
        while self.waiting != NO_TASK && wakeup_of(tasks, self.waiting) <= now {
            let id = self.waiting;
            self.waiting = next_of(tasks, id);
            set_next(tasks, id, NO_TASK);
            self.enqueue_ready(tasks, id);
        }
    }

    /// Explicitly wake one waiting task (mutex handoff).
    pub fn wake(&mut self, tasks: &mut Slots, id: u8) {
        let mut head = self.waiting;
        let found = remove_from(tasks, &mut head, id);
        self.waiting = head;
        if found {
            self.enqueue_ready(tasks, id);
        }
    }

    /// Whether every task slot is dormant or empty.
    #[must_use]
    pub fn all_dormant(&self, tasks: &Slots) -> bool {
        tasks
            .iter()
            .flatten()
            .all(|t| t.state == TaskState::Dormant)
    }

}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

// --- intrusive list helpers ---

fn next_of(tasks: &Slots, id: u8) -> u8 {
    tasks[id as usize].as_ref().map_or(NO_TASK, |t| t.next)
}

fn set_next(tasks: &mut Slots, id: u8, next: u8) {
    if let Some(t) = tasks[id as usize].as_mut() {
        t.next = next;
    }
}

fn prio_of(tasks: &Slots, id: u8) -> u8 {
    tasks[id as usize].as_ref().map_or(u8::MAX, |t| t.priority)
}

fn wakeup_of(tasks: &Slots, id: u8) -> u32 {
    tasks[id as usize].as_ref().map_or(u32::MAX, |t| t.wakeup)
}

fn set_state(tasks: &mut Slots, id: u8, state: TaskState) {
    if let Some(t) = tasks[id as usize].as_mut() {
        t.state = state;
    }
}

/// Insert `id` after the last list node for which `keep` holds;
/// returns the new head.
fn insert_into(tasks: &mut Slots, head: u8, id: u8, keep: impl Fn(&Slots, u8) -> bool) -> u8 {
    if head == NO_TASK || !keep(tasks, head) {
        set_next(tasks, id, head);
        return id;
    }
    let mut at = head;
    loop {
        let nxt = next_of(tasks, at);
        if nxt == NO_TASK || !keep(tasks, nxt) {
            set_next(tasks, id, nxt);
            set_next(tasks, at, id);
            return head;
        }
        at = nxt;
    }
}

/// Unlink `id` from the list at `head`; true when found.
fn remove_from(tasks: &mut Slots, head: &mut u8, id: u8) -> bool {
    if *head == NO_TASK {
        return false;
    }
    if *head == id {
        *head = next_of(tasks, id);
        set_next(tasks, id, NO_TASK);
        return true;
    }
    let mut at = *head;
    loop {
        let nxt = next_of(tasks, at);
        if nxt == NO_TASK {
            return false;
        }
        if nxt == id {
            set_next(tasks, at, next_of(tasks, id));
            set_next(tasks, id, NO_TASK);
            return true;
        }
        at = nxt;
    }
}
