// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Class and method registry.
//!
//! Classes are pool objects created at init (built-ins) or by the
//! `CLASS` opcode (user classes); they live for the process lifetime
//! and are exempt from reference counting. Each class carries a
//! singly-linked method list; definition prepends, so a redefinition
//! shadows the old entry and open classes behave like the source
//! language. Lookup walks the method list, then the superclass chain;
//! the first hit wins and no linearization is performed.

#[cfg(test)]
mod class_test;

use crate::memory::Memory;
use crate::pool::{OWNER_SYSTEM, Pool};
use crate::symbol::SymId;
use crate::types::Addr;
use crate::value::{ObjHead, Value, handle_kind, handle_kind_of, kv_new, tag};

/// A class object in pool memory.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct ClassObj {
    pub head: ObjHead,
    /// Class name (raw symbol id).
    pub name: u32,
    /// Superclass, null only for the root (`Object`).
    pub superclass: Addr,
    /// Head of the method entry list, null when empty.
    pub methods: Addr,
    /// Class-variable store.
    pub cvars: Addr,
    /// Next class in the registry chain.
    pub next: Addr,
}

/// One method list entry.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
struct MethodEnt {
    next: Addr,
    sym: u32,
    /// 0 = builtin, 1 = bytecode.
    kind: u32,
    /// Builtin id or IREP address.
    body: u32,
}

const KIND_BUILTIN: u32 = 0;
const KIND_IREP: u32 = 1;

/// A method body: native code by dispatch id, or a bytecode IREP.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodBody {
    /// Index into the builtin dispatch table.
    Builtin(u16),
    /// Pool address of the method's IREP.
    Irep(Addr),
}

/// Addresses of the built-in classes, fixed at init.
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinClasses {
    pub object: Addr,
    pub nil_cls: Addr,
    pub true_cls: Addr,
    pub false_cls: Addr,
    pub integer: Addr,
    pub float: Addr,
    pub symbol: Addr,
    pub string: Addr,
    pub array: Addr,
    pub hash: Addr,
    pub range: Addr,
    pub proc_cls: Addr,
    pub class_cls: Addr,
    pub exception: Addr,
    pub standard_error: Addr,
    pub runtime_error: Addr,
    pub type_error: Addr,
    pub zero_division_error: Addr,
    pub argument_error: Addr,
    pub index_error: Addr,
    pub name_error: Addr,
    pub no_method_error: Addr,
    pub no_memory_error: Addr,
    pub task: Addr,
    pub mutex: Addr,
}

/// The class registry.
pub struct ClassTable {
    /// Chain of all classes for name lookup.
    head: Addr,
    /// Fixed built-in class addresses.
    pub builtin: BuiltinClasses,
}

impl ClassTable {
    /// An empty registry; built-ins are created during bootstrap.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: Addr::null(),
            builtin: BuiltinClasses {
                object: Addr::null(),
                nil_cls: Addr::null(),
                true_cls: Addr::null(),
                false_cls: Addr::null(),
                integer: Addr::null(),
                float: Addr::null(),
                symbol: Addr::null(),
                string: Addr::null(),
                array: Addr::null(),
                hash: Addr::null(),
                range: Addr::null(),
                proc_cls: Addr::null(),
                class_cls: Addr::null(),
                exception: Addr::null(),
                standard_error: Addr::null(),
                runtime_error: Addr::null(),
                type_error: Addr::null(),
                zero_division_error: Addr::null(),
                argument_error: Addr::null(),
                index_error: Addr::null(),
                name_error: Addr::null(),
                no_method_error: Addr::null(),
                no_memory_error: Addr::null(),
                task: Addr::null(),
                mutex: Addr::null(),
            },
        }
    }

    /// Create class `name < superclass`, or return it when it already
    /// exists (open classes). A null superclass means `Object`, except
    /// for the root itself.
    pub fn define_class<M: Memory>(
        &mut self,
        pool: &mut Pool,
        mem: &mut M,
        name: SymId,
        superclass: Addr,
    ) -> Option<Addr> {
        if let Some(existing) = self.find_class(mem, name) {
            return Some(existing);
        }
        let superclass = if superclass.is_null() && !self.builtin.object.is_null() {
            self.builtin.object
        } else {
            superclass
        };
        let cvars = kv_new(pool, mem, OWNER_SYSTEM, 0)?;
        let addr = pool.alloc(mem, core::mem::size_of::<ClassObj>() as u32, OWNER_SYSTEM)?;
        mem.write(
            addr,
            ClassObj {
                head: ObjHead::new(tag::CLASS),
                name: u32::from(name.as_u16()),
                superclass,
                methods: Addr::null(),
                cvars,
                next: self.head,
            },
        );
        self.head = addr;
        Some(addr)
    }

    /// Find a class by name symbol.
    #[must_use]
    pub fn find_class<M: Memory>(&self, mem: &M, name: SymId) -> Option<Addr> {
        let mut at = self.head;
        while !at.is_null() {
            let cls: ClassObj = mem.read(at);
            if cls.name == u32::from(name.as_u16()) {
                return Some(at);
            }
            at = cls.next;
        }
        None
    }

    /// Prepend a method entry to `class`.
    pub fn define_method<M: Memory>(
        &self,
        pool: &mut Pool,
        mem: &mut M,
        class: Addr,
        sym: SymId,
        body: MethodBody,
    ) -> Option<()> {
        let (kind, raw) = match body {
            MethodBody::Builtin(id) => (KIND_BUILTIN, u32::from(id)),
            MethodBody::Irep(irep) => (KIND_IREP, irep.as_u32()),
        };
        let mut cls: ClassObj = mem.read(class);
        let ent = pool.alloc(mem, core::mem::size_of::<MethodEnt>() as u32, OWNER_SYSTEM)?;
        mem.write(
            ent,
            MethodEnt {
                next: cls.methods,
                sym: u32::from(sym.as_u16()),
                kind,
                body: raw,
            },
        );
        cls.methods = ent;
        mem.write(class, cls);
        Some(())
    }

    /// Resolve `sym` starting at `class`, walking the superclass chain.
    ///
    /// Returns the body and the class the method was found on (the
    /// caller's `own_class` for `super` resolution).
    #[must_use]
    pub fn find_method<M: Memory>(
        &self,
        mem: &M,
        class: Addr,
        sym: SymId,
    ) -> Option<(MethodBody, Addr)> {
        let mut cls_at = class;
        while !cls_at.is_null() {
            let cls: ClassObj = mem.read(cls_at);
            let mut ent_at = cls.methods;
            while !ent_at.is_null() {
                let ent: MethodEnt = mem.read(ent_at);
                if ent.sym == u32::from(sym.as_u16()) {
                    let body = if ent.kind == KIND_BUILTIN {
                        MethodBody::Builtin(ent.body as u16)
                    } else {
                        MethodBody::Irep(Addr::new(ent.body))
                    };
                    return Some((body, cls_at));
                }
                ent_at = ent.next;
            }
            cls_at = cls.superclass;
        }
        None
    }

    /// Whether `class` is `target` or inherits from it.
    #[must_use]
    pub fn is_kind_of<M: Memory>(&self, mem: &M, class: Addr, target: Addr) -> bool {
        let mut at = class;
        while !at.is_null() {
            if at == target {
                return true;
            }
            let cls: ClassObj = mem.read(at);
            at = cls.superclass;
        }
        false
    }

    /// The class that method lookup starts at for a receiver.
    ///
    /// A class receiver starts at itself: instance and "class side"
    /// methods share one table, which is how `A.new` reaches the
    /// definition on `Object`.
    #[must_use]
    pub fn class_of<M: Memory>(&self, mem: &M, v: Value) -> Addr {
        let b = &self.builtin;
        match v {
            Value::Empty | Value::Nil => b.nil_cls,
            Value::Bool(true) => b.true_cls,
            Value::Bool(false) => b.false_cls,
            Value::Int(_) => b.integer,
            Value::Float(_) => b.float,
            Value::Symbol(_) => b.symbol,
            Value::String(_) => b.string,
            Value::Array(_) => b.array,
            Value::Hash(_) => b.hash,
            Value::Range(_) => b.range,
            Value::Proc(_) => b.proc_cls,
            Value::Class(addr) => addr,
            Value::Object(addr) => {
                let inst: crate::value::HeapInstance = mem.read(addr);
                inst.class
            }
            Value::Exception(addr) => {
                let exc: crate::value::HeapException = mem.read(addr);
                exc.class
            }
            Value::Handle(addr) => {
                if handle_kind_of(mem, addr) == handle_kind::TASK {
                    b.task
                } else {
                    b.mutex
                }
            }
        }
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The name symbol of the class at `addr`.
#[must_use]
pub fn class_name<M: Memory>(mem: &M, addr: Addr) -> SymId {
    if addr.is_null() {
        return SymId::new(0);
    }
    let cls: ClassObj = mem.read(addr);
    SymId::new(cls.name as u16)
}

/// Read the class-variable store address of `class`.
#[must_use]
pub fn class_cvars<M: Memory>(mem: &M, class: Addr) -> Addr {
    let cls: ClassObj = mem.read(class);
    cls.cvars
}

/// Write back a (possibly moved) class-variable store address.
pub fn set_class_cvars<M: Memory>(mem: &mut M, class: Addr, cvars: Addr) {
    let mut cls: ClassObj = mem.read(class);
    cls.cvars = cvars;
    mem.write(class, cls);
}

/// Superclass of the class at `addr` (null for the root).
#[must_use]
pub fn class_super<M: Memory>(mem: &M, addr: Addr) -> Addr {
    let cls: ClassObj = mem.read(addr);
    cls.superclass
}
