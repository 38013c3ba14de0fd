// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Tests for the class/method registry.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{ClassTable, MethodBody, class_name, class_super};
use crate::memory::OwnedMemory;
use crate::pool::Pool;
use crate::symbol::SymbolTable;
use crate::types::Addr;
use crate::value::Value;

fn setup() -> (ClassTable, Pool, OwnedMemory, SymbolTable) {
    let mut mem = OwnedMemory::new(64 * 1024);
    let pool = Pool::new(&mut mem, Addr::null(), 64 * 1024).unwrap();
    (ClassTable::new(), pool, mem, SymbolTable::new())
}

#[test]
fn define_class_is_idempotent() {
    let (mut classes, mut pool, mut mem, mut syms) = setup();
    let name = syms.intern_static(&mem, "Widget").unwrap();
    let a = classes.define_class(&mut pool, &mut mem, name, Addr::null()).unwrap();
    let b = classes.define_class(&mut pool, &mut mem, name, Addr::null()).unwrap();
    assert_eq!(a, b);
    assert_eq!(class_name(&mem, a), name);
}

#[test]
fn find_class_by_name() {
    let (mut classes, mut pool, mut mem, mut syms) = setup();
    let a_sym = syms.intern_static(&mem, "A").unwrap();
    let b_sym = syms.intern_static(&mem, "B").unwrap();
    let a = classes.define_class(&mut pool, &mut mem, a_sym, Addr::null()).unwrap();
    assert_eq!(classes.find_class(&mem, a_sym), Some(a));
    assert_eq!(classes.find_class(&mem, b_sym), None);
}

#[test]
fn default_superclass_is_object() {
    let (mut classes, mut pool, mut mem, mut syms) = setup();
    let object_sym = syms.intern_static(&mem, "Object").unwrap();
    let object = classes
        .define_class(&mut pool, &mut mem, object_sym, Addr::null())
        .unwrap();
    classes.builtin.object = object;

    let a_sym = syms.intern_static(&mem, "A").unwrap();
    let a = classes.define_class(&mut pool, &mut mem, a_sym, Addr::null()).unwrap();
    assert_eq!(class_super(&mem, a), object);
}

#[test]
fn find_method_walks_the_super_chain() {
    let (mut classes, mut pool, mut mem, mut syms) = setup();
    let base_sym = syms.intern_static(&mem, "Base").unwrap();
    let sub_sym = syms.intern_static(&mem, "Sub").unwrap();
    let m = syms.intern_static(&mem, "m").unwrap();

    let base = classes.define_class(&mut pool, &mut mem, base_sym, Addr::null()).unwrap();
    let sub = classes.define_class(&mut pool, &mut mem, sub_sym, base).unwrap();
    classes
        .define_method(&mut pool, &mut mem, base, m, MethodBody::Builtin(7))
        .unwrap();

    // Found via the subclass, attributed to the base class.
    let (body, own) = classes.find_method(&mem, sub, m).unwrap();
    assert_eq!(body, MethodBody::Builtin(7));
    assert_eq!(own, base);
}

#[test]
fn find_method_is_stable() {
    let (mut classes, mut pool, mut mem, mut syms) = setup();
    let c_sym = syms.intern_static(&mem, "C").unwrap();
    let m = syms.intern_static(&mem, "m").unwrap();
    let c = classes.define_class(&mut pool, &mut mem, c_sym, Addr::null()).unwrap();
    classes
        .define_method(&mut pool, &mut mem, c, m, MethodBody::Builtin(1))
        .unwrap();

    let first = classes.find_method(&mem, c, m).unwrap();
    for _ in 0..10 {
        assert_eq!(classes.find_method(&mem, c, m).unwrap(), first);
    }
}

#[test]
fn redefinition_shadows_the_old_entry() {
    let (mut classes, mut pool, mut mem, mut syms) = setup();
    let c_sym = syms.intern_static(&mem, "C").unwrap();
    let m = syms.intern_static(&mem, "m").unwrap();
    let c = classes.define_class(&mut pool, &mut mem, c_sym, Addr::null()).unwrap();

    classes
        .define_method(&mut pool, &mut mem, c, m, MethodBody::Builtin(1))
        .unwrap();
    classes
        .define_method(&mut pool, &mut mem, c, m, MethodBody::Builtin(2))
        .unwrap();

    let (body, _) = classes.find_method(&mem, c, m).unwrap();
    assert_eq!(body, MethodBody::Builtin(2));
}

#[test]
fn subclass_overrides_win_over_super() {
    let (mut classes, mut pool, mut mem, mut syms) = setup();
    let base_sym = syms.intern_static(&mem, "Base").unwrap();
    let sub_sym = syms.intern_static(&mem, "Sub").unwrap();
    let m = syms.intern_static(&mem, "m").unwrap();

    let base = classes.define_class(&mut pool, &mut mem, base_sym, Addr::null()).unwrap();
    let sub = classes.define_class(&mut pool, &mut mem, sub_sym, base).unwrap();
    classes
        .define_method(&mut pool, &mut mem, base, m, MethodBody::Builtin(1))
        .unwrap();
    classes
        .define_method(&mut pool, &mut mem, sub, m, MethodBody::Builtin(2))
        .unwrap();

    let (body, own) = classes.find_method(&mem, sub, m).unwrap();
    assert_eq!(body, MethodBody::Builtin(2));
    assert_eq!(own, sub);
    // The base class still sees its own definition.
    let (body, _) = classes.find_method(&mem, base, m).unwrap();
    assert_eq!(body, MethodBody::Builtin(1));
}

#[test]
fn is_kind_of_walks_up_only() {
    let (mut classes, mut pool, mut mem, mut syms) = setup();
    let base_sym = syms.intern_static(&mem, "Base").unwrap();
    let sub_sym = syms.intern_static(&mem, "Sub").unwrap();
    let base = classes.define_class(&mut pool, &mut mem, base_sym, Addr::null()).unwrap();
    let sub = classes.define_class(&mut pool, &mut mem, sub_sym, base).unwrap();

    assert!(classes.is_kind_of(&mem, sub, base));
    assert!(classes.is_kind_of(&mem, sub, sub));
    assert!(!classes.is_kind_of(&mem, base, sub));
}

#[test]
fn class_receivers_look_up_on_themselves() {
    let (mut classes, mut pool, mut mem, mut syms) = setup();
    let c_sym = syms.intern_static(&mem, "C").unwrap();
    let c = classes.define_class(&mut pool, &mut mem, c_sym, Addr::null()).unwrap();
    assert_eq!(classes.class_of(&mem, Value::Class(c)), c);
}
