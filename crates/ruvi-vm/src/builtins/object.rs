// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Object/Kernel builtins: output, formatting, `raise`, `new`, object
//! identity and reflection.

use super::{arg, bid};
use crate::class::MethodBody;
use crate::console::Console;
use crate::console::fmt::{ConsoleSink, Piece, Sink, Template};
use crate::memory::Memory;
use crate::platform::Platform;
use crate::symbol::SymbolTable;
use crate::task::Task;
use crate::value::{self, HeapException, PrintStyle, Value, print_value};
use crate::vm::frames;
use crate::vm::{BuiltinRet, Env, VmErr};

/// `puts`: display each argument followed by a newline; arrays print
/// one element per line. No arguments prints a bare newline.
pub fn puts<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    if argc == 0 {
        env.con.put(b'\n');
    }
    for n in 0..argc as usize {
        puts_one(env, arg(task, abs, n));
    }
    Ok(BuiltinRet::Value(Value::Nil))
}

fn puts_one<M: Memory, C: Console, P: Platform>(env: &mut Env<'_, M, C, P>, v: Value) {
    if let Value::Array(addr) = v {
        let len = value::array_len(env.mem, addr);
        if len == 0 {
            env.con.put(b'\n');
        }
        for i in 0..len as usize {
            let elem = value::array_get(env.mem, addr, i);
            puts_one(env, elem);
        }
        return;
    }
    let ends_nl = matches!(v, Value::String(addr)
        if value::string_bytes(env.mem, addr).last() == Some(&b'\n'));
    let mut out = ConsoleSink(env.con);
    print_value(env.mem, env.syms, v, PrintStyle::Display, &mut out);
    if !ends_nl {
        env.con.put(b'\n');
    }
}

/// `print`: display each argument, no separator, no newline.
pub fn print<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    for n in 0..argc as usize {
        let v = arg(task, abs, n);
        let mut out = ConsoleSink(env.con);
        print_value(env.mem, env.syms, v, PrintStyle::Display, &mut out);
    }
    Ok(BuiltinRet::Value(Value::Nil))
}

/// `p`: inspect each argument on its own line; returns the first
/// argument.
pub fn p<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    for n in 0..argc as usize {
        let v = arg(task, abs, n);
        let mut out = ConsoleSink(env.con);
        print_value(env.mem, env.syms, v, PrintStyle::Inspect, &mut out);
        env.con.put(b'\n');
    }
    let result = if argc > 0 {
        let v = arg(task, abs, 0);
        value::incref(env.mem, v);
        v
    } else {
        Value::Nil
    };
    Ok(BuiltinRet::Value(result))
}

/// `printf`: format straight to the console.
pub fn printf<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    if argc == 0 {
        return Err(VmErr::Argument("printf needs a format string"));
    }
    let Value::String(fmt_addr) = arg(task, abs, 0) else {
        return Err(VmErr::Type("format must be a String"));
    };
    let args = &task.regs[abs + 2..abs + 1 + argc as usize];
    let mut out = ConsoleSink(env.con);
    render_format(env.mem, env.syms, fmt_addr, args, &mut out)?;
    Ok(BuiltinRet::Value(Value::Nil))
}

/// `sprintf`: format into a fresh pool string.
pub fn sprintf<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    if argc == 0 {
        return Err(VmErr::Argument("sprintf needs a format string"));
    }
    let Value::String(fmt_addr) = arg(task, abs, 0) else {
        return Err(VmErr::Type("format must be a String"));
    };
    let args = &task.regs[abs + 2..abs + 1 + argc as usize];
    let mut buf = BufSink::new();
    render_format(env.mem, env.syms, fmt_addr, args, &mut buf)?;
    let text = buf.text()?;
    let s = value::string_new(env.pool, env.mem, task.id, text).ok_or(VmErr::NoMemory)?;
    Ok(BuiltinRet::Value(s))
}

/// Drive the printf engine over `fmt` and `args`.
fn render_format<M: Memory, S: Sink>(
    mem: &M,
    syms: &SymbolTable,
    fmt_addr: crate::types::Addr,
    args: &[Value],
    out: &mut S,
) -> Result<(), VmErr> {
    let fmt = value::string_bytes(mem, fmt_addr);
    let mut template = Template::new(fmt);
    let mut next = 0usize;
    while let Some(piece) = template.next_piece() {
        match piece {
            Ok(Piece::Lit(lit)) => {
                for &b in lit {
                    out.push(b);
                }
            }
            Ok(Piece::Spec(spec)) => {
                let v = *args.get(next).ok_or(VmErr::Argument("too few arguments"))?;
                next += 1;
                match spec.conv {
                    b's' => {
                        let mut buf = BufSink::new();
                        print_value(mem, syms, v, PrintStyle::Display, &mut buf);
                        crate::console::fmt::format_str(out, &spec, buf.text()?);
                    }
                    b'f' | b'e' | b'g' => match v {
                        Value::Int(n) => {
                            crate::console::fmt::format_float(out, &spec, n as f64);
                        }
                        Value::Float(x) => crate::console::fmt::format_float(out, &spec, x),
                        _ => return Err(VmErr::Type("numeric argument required")),
                    },
                    _ => match v {
                        Value::Int(n) => crate::console::fmt::format_int(out, &spec, n),
                        Value::Float(x) => {
                            crate::console::fmt::format_int(out, &spec, x as i64);
                        }
                        _ => return Err(VmErr::Type("numeric argument required")),
                    },
                }
            }
            Err(_) => return Err(VmErr::Argument("malformed format string")),
        }
    }
    Ok(())
}

/// `raise`: set the task's pending exception.
///
/// Accepted forms: bare, message string, exception class, exception
/// class + message, existing exception object.
pub fn raise<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    let b = &env.classes.builtin;
    let (class, message) = match (argc, arg(task, abs, 0)) {
        (0, _) => (b.runtime_error, Value::Nil),
        (_, Value::String(_)) => {
            let msg = arg(task, abs, 0);
            value::incref(env.mem, msg);
            (b.runtime_error, msg)
        }
        (_, Value::Class(cls)) => {
            if !env.classes.is_kind_of(env.mem, cls, b.exception) {
                return Err(VmErr::Type("exception class expected"));
            }
            let msg = if argc >= 2 { arg(task, abs, 1) } else { Value::Nil };
            if !matches!(msg, Value::String(_) | Value::Nil) {
                return Err(VmErr::Type("exception message must be a String"));
            }
            value::incref(env.mem, msg);
            (cls, msg)
        }
        (_, v @ Value::Exception(_)) => {
            value::incref(env.mem, v);
            frames::set_exc(task, env, v);
            return Ok(BuiltinRet::Value(Value::Nil));
        }
        _ => return Err(VmErr::Type("exception class or message expected")),
    };
    let exc =
        value::exception_new(env.pool, env.mem, task.id, class, message).ok_or(VmErr::NoMemory)?;
    frames::set_exc(task, env, exc);
    Ok(BuiltinRet::Value(Value::Nil))
}

/// `new`: allocate an instance and run `initialize` as a normal frame.
pub fn new<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    let Value::Class(cls) = task.regs[abs] else {
        return Err(VmErr::Type("new on a non-class"));
    };
    let b = &env.classes.builtin;

    if cls == b.mutex {
        let m = value::mutex_new(env.pool, env.mem, task.id).ok_or(VmErr::NoMemory)?;
        return Ok(BuiltinRet::Value(m));
    }
    if env.classes.is_kind_of(env.mem, cls, b.exception) {
        let msg = if argc >= 1 { arg(task, abs, 0) } else { Value::Nil };
        if !matches!(msg, Value::String(_) | Value::Nil) {
            return Err(VmErr::Type("exception message must be a String"));
        }
        value::incref(env.mem, msg);
        let exc = value::exception_new(env.pool, env.mem, task.id, cls, msg)
            .ok_or(VmErr::NoMemory)?;
        return Ok(BuiltinRet::Value(exc));
    }
    if cls == b.task {
        return Err(VmErr::Type("tasks are created by the host"));
    }

    let instance = value::instance_new(env.pool, env.mem, task.id, cls).ok_or(VmErr::NoMemory)?;
    match env.classes.find_method(env.mem, cls, env.known.initialize) {
        Some((MethodBody::Irep(irep), found_cls)) => {
            // Replace the class in the receiver slot; the constructor
            // frame then sees the instance as self.
            frames::set_reg_abs(task, env, abs, instance);
            Ok(BuiltinRet::EnterIrep {
                irep,
                own_class: found_cls,
                method: env.known.initialize,
                ctor: true,
            })
        }
        _ => Ok(BuiltinRet::Value(instance)),
    }
}

/// `dup`.
pub fn dup<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
) -> Result<BuiltinRet, VmErr> {
    let v = value::dup(env.pool, env.mem, task.id, task.regs[abs]).ok_or(VmErr::NoMemory)?;
    Ok(BuiltinRet::Value(v))
}

/// `class`.
pub fn class<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
) -> Result<BuiltinRet, VmErr> {
    let cls = env.classes.class_of(env.mem, task.regs[abs]);
    Ok(BuiltinRet::Value(Value::Class(cls)))
}

/// `object_id`: stable identity; heap values use their pool address.
pub fn object_id<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
) -> Result<BuiltinRet, VmErr> {
    let _ = env;
    let id = match task.regs[abs] {
        Value::Nil | Value::Empty => 8,
        Value::Bool(false) => 0,
        Value::Bool(true) => 20,
        Value::Int(n) => n.wrapping_mul(2).wrapping_add(1),
        Value::Float(x) => x.to_bits() as i64,
        Value::Symbol(s) => i64::from(s.as_u16()) << 8,
        other => other.heap_addr().map_or(0, |a| i64::from(a.as_u32())),
    };
    Ok(BuiltinRet::Value(Value::int(id)))
}

/// `kind_of?` / `is_a?`.
pub fn kind_of<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    argc: u8,
) -> Result<BuiltinRet, VmErr> {
    if argc < 1 {
        return Err(VmErr::Argument("wrong number of arguments"));
    }
    let Value::Class(target) = arg(task, abs, 0) else {
        return Err(VmErr::Type("class required"));
    };
    let cls = env.classes.class_of(env.mem, task.regs[abs]);
    let res = env.classes.is_kind_of(env.mem, cls, target);
    Ok(BuiltinRet::Value(Value::bool(res)))
}

/// `block_given?`: whether the current frame received a block.
pub fn block_given<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
) -> Result<BuiltinRet, VmErr> {
    let _ = (env, abs);
    let given = task.current_ci().is_some_and(|ci| {
        let block_at = task.base as usize + ci.n_args as usize + 1;
        matches!(task.regs.get(block_at), Some(Value::Proc(_)))
    });
    Ok(BuiltinRet::Value(Value::bool(given)))
}

/// `==` / `!=` as methods.
pub fn eq<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    negate: bool,
) -> Result<BuiltinRet, VmErr> {
    let equal = value::compare(env.mem, task.regs[abs], arg(task, abs, 0)) == 0;
    Ok(BuiltinRet::Value(Value::bool(equal != negate)))
}

/// `to_s`.
pub fn to_s<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
) -> Result<BuiltinRet, VmErr> {
    stringify(task, env, abs, PrintStyle::Display)
}

/// `inspect`.
pub fn inspect<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
) -> Result<BuiltinRet, VmErr> {
    stringify(task, env, abs, PrintStyle::Inspect)
}

fn stringify<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    style: PrintStyle,
) -> Result<BuiltinRet, VmErr> {
    let mut buf = BufSink::new();
    print_value(env.mem, env.syms, task.regs[abs], style, &mut buf);
    let text = buf.text()?;
    let s = value::string_new(env.pool, env.mem, task.id, text).ok_or(VmErr::NoMemory)?;
    Ok(BuiltinRet::Value(s))
}

/// `to_i`/`to_f`/`abs` for Integer and Float receivers.
pub fn numeric<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
    id: u16,
) -> Result<BuiltinRet, VmErr> {
    let _ = env;
    let v = match (task.regs[abs], id) {
        (Value::Int(n), bid::NUM_TO_I) => Value::int(n),
        (Value::Int(n), bid::NUM_TO_F) => Value::float(n as f64),
        (Value::Int(n), _) => Value::int(n.wrapping_abs()),
        (Value::Float(x), bid::NUM_TO_I) => Value::int(x as i64),
        (Value::Float(x), bid::NUM_TO_F) => Value::float(x),
        (Value::Float(x), _) => Value::float(x.abs()),
        _ => return Err(VmErr::Type("numeric receiver required")),
    };
    Ok(BuiltinRet::Value(v))
}

/// `Exception#message`.
pub fn exc_message<M: Memory, C: Console, P: Platform>(
    task: &mut Task,
    env: &mut Env<'_, M, C, P>,
    abs: usize,
) -> Result<BuiltinRet, VmErr> {
    let Value::Exception(addr) = task.regs[abs] else {
        return Err(VmErr::Type("exception receiver required"));
    };
    let exc: HeapException = env.mem.read(addr);
    if let Value::String(_) = exc.message {
        value::incref(env.mem, exc.message);
        return Ok(BuiltinRet::Value(exc.message));
    }
    // No message: fall back to the class name.
    let name = crate::class::class_name(env.mem, exc.class);
    let mut buf = [0u8; 64];
    let len = env.syms.name(env.mem, name).map_or(0, |n| {
        let len = n.len().min(64);
        buf[..len].copy_from_slice(&n.as_bytes()[..len]);
        len
    });
    let s = value::string_new(env.pool, env.mem, task.id, &buf[..len]).ok_or(VmErr::NoMemory)?;
    Ok(BuiltinRet::Value(s))
}

/// Bounded byte sink for `sprintf`, `to_s` and `%s` staging.
pub struct BufSink {
    buf: [u8; 512],
    len: usize,
    overflow: bool,
}

impl BufSink {
    /// An empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: [0; 512],
            len: 0,
            overflow: false,
        }
    }

    /// The collected bytes, or an error if the buffer overflowed.
    pub fn text(&self) -> Result<&[u8], VmErr> {
        if self.overflow {
            return Err(VmErr::Argument("formatted result too long"));
        }
        Ok(&self.buf[..self.len])
    }
}

impl Default for BufSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for BufSink {
    fn push(&mut self, byte: u8) {
        if self.len < self.buf.len() {
            self.buf[self.len] = byte;
            self.len += 1;
        } else {
            self.overflow = true;
        }
    }
}
