// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Runtime bootstrap: built-in classes and their method tables.
//!
//! Everything here is created once at init and lives for the process
//! lifetime. Each built-in class is also registered as a constant so
//! `GETCONST` resolves it.

use crate::builtins::bid;
use crate::class::{ClassTable, MethodBody};
use crate::memory::Memory;
use crate::pool::Pool;
use crate::symbol::SymbolTable;
use crate::types::Addr;
use crate::value::{Value, kv_set};

/// Create the built-in class hierarchy and method tables.
///
/// Returns the (possibly moved) constant store, or `None` on pool or
/// symbol-table exhaustion.
pub fn install<M: Memory>(
    pool: &mut Pool,
    syms: &mut SymbolTable,
    classes: &mut ClassTable,
    mem: &mut M,
    consts: Addr,
) -> Option<Addr> {
    let object = def_class(classes, pool, syms, mem, "Object", Addr::null())?;
    classes.builtin.object = object;

    classes.builtin.nil_cls = def_class(classes, pool, syms, mem, "NilClass", object)?;
    classes.builtin.true_cls = def_class(classes, pool, syms, mem, "TrueClass", object)?;
    classes.builtin.false_cls = def_class(classes, pool, syms, mem, "FalseClass", object)?;
    classes.builtin.integer = def_class(classes, pool, syms, mem, "Integer", object)?;
    classes.builtin.float = def_class(classes, pool, syms, mem, "Float", object)?;
    classes.builtin.symbol = def_class(classes, pool, syms, mem, "Symbol", object)?;
    classes.builtin.string = def_class(classes, pool, syms, mem, "String", object)?;
    classes.builtin.array = def_class(classes, pool, syms, mem, "Array", object)?;
    classes.builtin.hash = def_class(classes, pool, syms, mem, "Hash", object)?;
    classes.builtin.range = def_class(classes, pool, syms, mem, "Range", object)?;
    classes.builtin.proc_cls = def_class(classes, pool, syms, mem, "Proc", object)?;
    classes.builtin.class_cls = def_class(classes, pool, syms, mem, "Class", object)?;
    classes.builtin.task = def_class(classes, pool, syms, mem, "Task", object)?;
    classes.builtin.mutex = def_class(classes, pool, syms, mem, "Mutex", object)?;

    let exception = def_class(classes, pool, syms, mem, "Exception", object)?;
    classes.builtin.exception = exception;
    let std_err = def_class(classes, pool, syms, mem, "StandardError", exception)?;
    classes.builtin.standard_error = std_err;
    classes.builtin.runtime_error = def_class(classes, pool, syms, mem, "RuntimeError", std_err)?;
    classes.builtin.type_error = def_class(classes, pool, syms, mem, "TypeError", std_err)?;
    classes.builtin.zero_division_error =
        def_class(classes, pool, syms, mem, "ZeroDivisionError", std_err)?;
    classes.builtin.argument_error =
        def_class(classes, pool, syms, mem, "ArgumentError", std_err)?;
    classes.builtin.index_error = def_class(classes, pool, syms, mem, "IndexError", std_err)?;
    let name_error = def_class(classes, pool, syms, mem, "NameError", std_err)?;
    classes.builtin.name_error = name_error;
    classes.builtin.no_method_error =
        def_class(classes, pool, syms, mem, "NoMethodError", name_error)?;
    classes.builtin.no_memory_error =
        def_class(classes, pool, syms, mem, "NoMemoryError", exception)?;

    install_methods(pool, syms, classes, mem)?;

    register_constants(pool, syms, classes, mem, consts)
}

/// The Kernel-ish and per-type method tables.
fn install_methods<M: Memory>(
    pool: &mut Pool,
    syms: &mut SymbolTable,
    classes: &ClassTable,
    mem: &mut M,
) -> Option<()> {
    let b = classes.builtin;

    let object_methods: &[(&str, u16)] = &[
        ("puts", bid::OBJ_PUTS),
        ("print", bid::OBJ_PRINT),
        ("p", bid::OBJ_P),
        ("printf", bid::OBJ_PRINTF),
        ("sprintf", bid::OBJ_SPRINTF),
        ("format", bid::OBJ_SPRINTF),
        ("raise", bid::OBJ_RAISE),
        ("new", bid::OBJ_NEW),
        ("dup", bid::OBJ_DUP),
        ("class", bid::OBJ_CLASS),
        ("object_id", bid::OBJ_OBJECT_ID),
        ("kind_of?", bid::OBJ_KIND_OF),
        ("is_a?", bid::OBJ_KIND_OF),
        ("block_given?", bid::OBJ_BLOCK_GIVEN),
        ("to_s", bid::OBJ_TO_S),
        ("inspect", bid::OBJ_INSPECT),
        ("initialize", bid::OBJ_INITIALIZE),
        ("==", bid::OBJ_EQ),
        ("!=", bid::OBJ_NOT_EQ),
        ("sleep", bid::KERNEL_SLEEP),
        ("sleep_ms", bid::KERNEL_SLEEP_MS),
    ];
    for (name, id) in object_methods {
        def_builtin(classes, pool, syms, mem, b.object, name, *id)?;
    }

    for cls in [b.integer, b.float] {
        def_builtin(classes, pool, syms, mem, cls, "to_i", bid::NUM_TO_I)?;
        def_builtin(classes, pool, syms, mem, cls, "to_f", bid::NUM_TO_F)?;
        def_builtin(classes, pool, syms, mem, cls, "abs", bid::NUM_ABS)?;
    }

    let string_methods: &[(&str, u16)] = &[
        ("size", bid::STR_SIZE),
        ("length", bid::STR_SIZE),
        ("to_i", bid::STR_TO_I),
        ("to_f", bid::STR_TO_F),
        ("<<", bid::STR_PUSH),
        ("[]", bid::IDX_GET),
    ];
    for (name, id) in string_methods {
        def_builtin(classes, pool, syms, mem, b.string, name, *id)?;
    }

    let array_methods: &[(&str, u16)] = &[
        ("size", bid::ARR_SIZE),
        ("length", bid::ARR_SIZE),
        ("count", bid::ARR_SIZE),
        ("push", bid::ARR_PUSH),
        ("<<", bid::ARR_PUSH),
        ("pop", bid::ARR_POP),
        ("first", bid::ARR_FIRST),
        ("last", bid::ARR_LAST),
        ("[]", bid::IDX_GET),
        ("[]=", bid::IDX_SET),
    ];
    for (name, id) in array_methods {
        def_builtin(classes, pool, syms, mem, b.array, name, *id)?;
    }

    let hash_methods: &[(&str, u16)] = &[
        ("size", bid::HASH_SIZE),
        ("length", bid::HASH_SIZE),
        ("key?", bid::HASH_HAS_KEY),
        ("has_key?", bid::HASH_HAS_KEY),
        ("include?", bid::HASH_HAS_KEY),
        ("[]", bid::IDX_GET),
        ("[]=", bid::IDX_SET),
    ];
    for (name, id) in hash_methods {
        def_builtin(classes, pool, syms, mem, b.hash, name, *id)?;
    }

    def_builtin(classes, pool, syms, mem, b.range, "first", bid::RANGE_FIRST)?;
    def_builtin(classes, pool, syms, mem, b.range, "last", bid::RANGE_LAST)?;
    def_builtin(
        classes,
        pool,
        syms,
        mem,
        b.range,
        "exclude_end?",
        bid::RANGE_EXCLUDE_END,
    )?;

    def_builtin(classes, pool, syms, mem, b.exception, "message", bid::EXC_MESSAGE)?;

    let task_methods: &[(&str, u16)] = &[
        ("current", bid::TASK_CURRENT),
        ("pass", bid::TASK_PASS),
        ("suspend", bid::TASK_SUSPEND),
        ("resume", bid::TASK_RESUME),
        ("terminate", bid::TASK_TERMINATE),
    ];
    for (name, id) in task_methods {
        def_builtin(classes, pool, syms, mem, b.task, name, *id)?;
    }

    let mutex_methods: &[(&str, u16)] = &[
        ("lock", bid::MUTEX_LOCK),
        ("unlock", bid::MUTEX_UNLOCK),
        ("try_lock", bid::MUTEX_TRY_LOCK),
        ("locked?", bid::MUTEX_LOCKED),
    ];
    for (name, id) in mutex_methods {
        def_builtin(classes, pool, syms, mem, b.mutex, name, *id)?;
    }

    Some(())
}

/// Make every built-in class reachable as a constant.
fn register_constants<M: Memory>(
    pool: &mut Pool,
    syms: &mut SymbolTable,
    classes: &ClassTable,
    mem: &mut M,
    consts: Addr,
) -> Option<Addr> {
    let b = classes.builtin;
    let all = [
        b.object,
        b.nil_cls,
        b.true_cls,
        b.false_cls,
        b.integer,
        b.float,
        b.symbol,
        b.string,
        b.array,
        b.hash,
        b.range,
        b.proc_cls,
        b.class_cls,
        b.exception,
        b.standard_error,
        b.runtime_error,
        b.type_error,
        b.zero_division_error,
        b.argument_error,
        b.index_error,
        b.name_error,
        b.no_method_error,
        b.no_memory_error,
        b.task,
        b.mutex,
    ];
    let mut consts = consts;
    for cls in all {
        let name = crate::class::class_name(mem, cls);
        consts = kv_set(pool, mem, consts, name, Value::Class(cls))?;
    }
    Some(consts)
}

fn def_class<M: Memory>(
    classes: &mut ClassTable,
    pool: &mut Pool,
    syms: &mut SymbolTable,
    mem: &mut M,
    name: &'static str,
    superclass: Addr,
) -> Option<Addr> {
    let sym = syms.intern_static(mem, name)?;
    classes.define_class(pool, mem, sym, superclass)
}

fn def_builtin<M: Memory>(
    classes: &ClassTable,
    pool: &mut Pool,
    syms: &mut SymbolTable,
    mem: &mut M,
    cls: Addr,
    name: &'static str,
    id: u16,
) -> Option<()> {
    let sym = syms.intern_static(mem, name)?;
    classes.define_method(pool, mem, cls, sym, MethodBody::Builtin(id))
}
