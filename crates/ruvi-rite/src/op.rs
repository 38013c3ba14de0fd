// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! RITE opcodes.
//!
//! Instructions are a one-byte opcode followed by zero or more operands.
//! Operand layouts are noted per opcode:
//!
//! - `Z`   - no operands
//! - `B`   - one unsigned byte
//! - `BB`  - two unsigned bytes
//! - `BBB` - three unsigned bytes
//! - `BS`  - byte + big-endian u16
//! - `BSS` - byte + two big-endian u16 (a 32-bit immediate)
//! - `S`   - big-endian u16
//! - `W`   - big-endian 24-bit word
//!
//! `R(a)` means register `a` of the current window, `Syms(b)` the current
//! IREP's symbol table, `Pool(b)` its literal pool, `Irep(b)` its child
//! IREP table.

/// `Z` - no operation.
pub const NOP: u8 = 0;
/// `BB` - `R(a) = R(b)`.
pub const MOVE: u8 = 1;
/// `BB` - `R(a) = Pool(b)`.
pub const LOADL: u8 = 2;
/// `BB` - `R(a) = b` (unsigned byte immediate).
pub const LOADI: u8 = 3;
/// `BB` - `R(a) = -b`.
pub const LOADINEG: u8 = 4;
/// `B` - `R(a) = -1`.
pub const LOADI__1: u8 = 5;
/// `B` - `R(a) = 0`.
pub const LOADI_0: u8 = 6;
/// `B` - `R(a) = 1`.
pub const LOADI_1: u8 = 7;
/// `B` - `R(a) = 2`.
pub const LOADI_2: u8 = 8;
/// `B` - `R(a) = 3`.
pub const LOADI_3: u8 = 9;
/// `B` - `R(a) = 4`.
pub const LOADI_4: u8 = 10;
/// `B` - `R(a) = 5`.
pub const LOADI_5: u8 = 11;
/// `B` - `R(a) = 6`.
pub const LOADI_6: u8 = 12;
/// `B` - `R(a) = 7`.
pub const LOADI_7: u8 = 13;
/// `BS` - `R(a) = s` (signed 16-bit immediate).
pub const LOADI16: u8 = 14;
/// `BSS` - `R(a) = ss` (signed 32-bit immediate).
pub const LOADI32: u8 = 15;
/// `BB` - `R(a) = Syms(b)` as a symbol value.
pub const LOADSYM: u8 = 16;
/// `B` - `R(a) = nil`.
pub const LOADNIL: u8 = 17;
/// `B` - `R(a) = self`.
pub const LOADSELF: u8 = 18;
/// `B` - `R(a) = true`.
pub const LOADT: u8 = 19;
/// `B` - `R(a) = false`.
pub const LOADF: u8 = 20;
/// `BB` - `R(a) = globals[Syms(b)]`.
pub const GETGV: u8 = 21;
/// `BB` - `globals[Syms(b)] = R(a)`.
pub const SETGV: u8 = 22;
/// `BB` - special variable load (unsupported; reserved).
pub const GETSV: u8 = 23;
/// `BB` - special variable store (unsupported; reserved).
pub const SETSV: u8 = 24;
/// `BB` - `R(a) = ivar[Syms(b)]` of `self`.
pub const GETIV: u8 = 25;
/// `BB` - `ivar[Syms(b)] = R(a)` on `self`.
pub const SETIV: u8 = 26;
/// `BB` - `R(a) = cvar[Syms(b)]` of the current class.
pub const GETCV: u8 = 27;
/// `BB` - `cvar[Syms(b)] = R(a)` on the current class.
pub const SETCV: u8 = 28;
/// `BB` - `R(a) = const[Syms(b)]`.
pub const GETCONST: u8 = 29;
/// `BB` - `const[Syms(b)] = R(a)`.
pub const SETCONST: u8 = 30;
/// `BB` - scoped constant load (unsupported; reserved).
pub const GETMCNST: u8 = 31;
/// `BB` - scoped constant store (unsupported; reserved).
pub const SETMCNST: u8 = 32;
/// `BBB` - upvar load (unsupported; reserved).
pub const GETUPVAR: u8 = 33;
/// `BBB` - upvar store (unsupported; reserved).
pub const SETUPVAR: u8 = 34;
/// `B` - `R(a) = R(a)[R(a+1)]`.
pub const GETIDX: u8 = 35;
/// `B` - `R(a)[R(a+1)] = R(a+2)`.
pub const SETIDX: u8 = 36;
/// `S` - jump to byte offset `s`.
pub const JMP: u8 = 37;
/// `BS` - jump to `s` when `R(a)` is truthy.
pub const JMPIF: u8 = 38;
/// `BS` - jump to `s` when `R(a)` is falsy.
pub const JMPNOT: u8 = 39;
/// `BS` - jump to `s` when `R(a)` is nil.
pub const JMPNIL: u8 = 40;
/// `S` - unwind jump (treated as `JMP`; ensure clauses are external).
pub const JMPUW: u8 = 41;
/// `B` - `R(a) =` the caught exception object.
pub const EXCEPT: u8 = 42;
/// `BB` - `R(b) = R(a).kind_of?(R(b))` rescue-clause class test.
pub const RESCUE: u8 = 43;
/// `B` - re-raise `R(a)` unless it is nil.
pub const RAISEIF: u8 = 44;
/// `BBB` - `R(a) = self.Syms(b)(R(a+1)..R(a+c))`.
pub const SSEND: u8 = 45;
/// `BBB` - `SSEND` with a block in `R(a+c+1)`.
pub const SSENDB: u8 = 46;
/// `BBB` - `R(a) = R(a).Syms(b)(R(a+1)..R(a+c))`.
pub const SEND: u8 = 47;
/// `BBB` - `SEND` with a block in `R(a+c+1)`.
pub const SENDB: u8 = 48;
/// `B` - invoke the Proc in `R(a)` with `R(a+1)..` as arguments.
pub const CALL: u8 = 49;
/// `BB` - `R(a) = super(R(a+1)..R(a+b))`.
pub const SUPER: u8 = 50;
/// `BS` - block argument array (unsupported; reserved).
pub const ARGARY: u8 = 51;
/// `W` - method prologue; checks arguments against the arg spec.
pub const ENTER: u8 = 52;
/// `BB` - keyword presence test (unsupported; reserved).
pub const KEY_P: u8 = 53;
/// `Z` - keyword end marker (unsupported; reserved).
pub const KEYEND: u8 = 54;
/// `BB` - keyword argument fetch (unsupported; reserved).
pub const KARG: u8 = 55;
/// `B` - return `R(a)` from the current method.
pub const RETURN: u8 = 56;
/// `B` - return `R(a)` from the enclosing method (block return).
pub const RETURN_BLK: u8 = 57;
/// `B` - break out of the enclosing block with `R(a)`.
pub const BREAK: u8 = 58;
/// `BS` - block push (unsupported; reserved).
pub const BLKPUSH: u8 = 59;
/// `B` - `R(a) = R(a) + R(a+1)`.
pub const ADD: u8 = 60;
/// `BB` - `R(a) = R(a) + b`.
pub const ADDI: u8 = 61;
/// `B` - `R(a) = R(a) - R(a+1)`.
pub const SUB: u8 = 62;
/// `BB` - `R(a) = R(a) - b`.
pub const SUBI: u8 = 63;
/// `B` - `R(a) = R(a) * R(a+1)`.
pub const MUL: u8 = 64;
/// `B` - `R(a) = R(a) / R(a+1)`.
pub const DIV: u8 = 65;
/// `B` - `R(a) = R(a) == R(a+1)`.
pub const EQ: u8 = 66;
/// `B` - `R(a) = R(a) < R(a+1)`.
pub const LT: u8 = 67;
/// `B` - `R(a) = R(a) <= R(a+1)`.
pub const LE: u8 = 68;
/// `B` - `R(a) = R(a) > R(a+1)`.
pub const GT: u8 = 69;
/// `B` - `R(a) = R(a) >= R(a+1)`.
pub const GE: u8 = 70;
/// `BB` - `R(a) = [R(a), .., R(a+b-1)]`.
pub const ARRAY: u8 = 71;
/// `BBB` - `R(a) = [R(b), .., R(b+c-1)]`.
pub const ARRAY2: u8 = 72;
/// `B` - array concat (unsupported; reserved).
pub const ARYCAT: u8 = 73;
/// `B` - `R(a).push(R(a+1))`.
pub const ARYPUSH: u8 = 74;
/// `B` - `R(a) = R(a).dup` (array literal copy).
pub const ARYDUP: u8 = 75;
/// `BBB` - splat reference (unsupported; reserved).
pub const AREF: u8 = 76;
/// `BBB` - splat assignment (unsupported; reserved).
pub const ASET: u8 = 77;
/// `BBB` - post-splat unpack (unsupported; reserved).
pub const APOST: u8 = 78;
/// `B` - `R(a) = R(a).to_sym`.
pub const INTERN: u8 = 79;
/// `BB` - `R(a) = Syms(b)` (symbol literal).
pub const SYMBOL: u8 = 80;
/// `BB` - `R(a) =` fresh string from `Pool(b)`.
pub const STRING: u8 = 81;
/// `B` - `R(a) = R(a) << R(a+1)` string concat.
pub const STRCAT: u8 = 82;
/// `BB` - `R(a) = { R(a) => R(a+1), .. }` from `b` pairs.
pub const HASH: u8 = 83;
/// `BB` - hash add (unsupported; reserved).
pub const HASHADD: u8 = 84;
/// `B` - hash concat (unsupported; reserved).
pub const HASHCAT: u8 = 85;
/// `BB` - `R(a) =` lambda from `Irep(b)`.
pub const LAMBDA: u8 = 86;
/// `BB` - `R(a) =` block Proc from `Irep(b)` capturing the current frame.
pub const BLOCK: u8 = 87;
/// `BB` - `R(a) =` method Proc from `Irep(b)`.
pub const METHOD: u8 = 88;
/// `B` - `R(a) = R(a)..R(a+1)` (inclusive).
pub const RANGE_INC: u8 = 89;
/// `B` - `R(a) = R(a)...R(a+1)` (exclusive).
pub const RANGE_EXC: u8 = 90;
/// `B` - `R(a) = ::Object`.
pub const OCLASS: u8 = 91;
/// `BB` - `R(a) =` class `Syms(b)` with superclass `R(a+1)`.
pub const CLASS: u8 = 92;
/// `BB` - module definition (unsupported; reserved).
pub const MODULE: u8 = 93;
/// `BB` - execute `Irep(b)` with `self = R(a)` (class body).
pub const EXEC: u8 = 94;
/// `BB` - define `Syms(b)` on class `R(a)` with body Proc `R(a+1)`.
pub const DEF: u8 = 95;
/// `BB` - method alias (unsupported; reserved).
pub const ALIAS: u8 = 96;
/// `B` - method undef (unsupported; reserved).
pub const UNDEF: u8 = 97;
/// `B` - singleton class (unsupported; reserved).
pub const SCLASS: u8 = 98;
/// `B` - `R(a) =` the target class of the current method.
pub const TCLASS: u8 = 99;
/// `BBB` - debug hook (skipped).
pub const DEBUG: u8 = 100;
/// `B` - compile-time error marker (raises).
pub const ERR: u8 = 101;
/// `Z` - operand width extension (unsupported; reserved).
pub const EXT1: u8 = 102;
/// `Z` - operand width extension (unsupported; reserved).
pub const EXT2: u8 = 103;
/// `Z` - operand width extension (unsupported; reserved).
pub const EXT3: u8 = 104;
/// `Z` - halt: end of the task's top-level IREP.
pub const STOP: u8 = 105;
/// `Z` - abort the current dispatch loop (internal trampolines).
pub const ABORT: u8 = 106;

/// Operand layout of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fmt {
    /// No operands.
    Z,
    /// One byte.
    B,
    /// Two bytes.
    BB,
    /// Three bytes.
    BBB,
    /// Byte + big-endian u16.
    BS,
    /// Byte + 32-bit immediate (two big-endian u16).
    BSS,
    /// Big-endian u16.
    S,
    /// Big-endian 24-bit word.
    W,
}

impl Fmt {
    /// Operand bytes following the opcode.
    #[inline]
    #[must_use]
    pub const fn operand_len(self) -> usize {
        match self {
            Self::Z => 0,
            Self::B => 1,
            Self::BB | Self::S => 2,
            Self::BBB | Self::BS | Self::W => 3,
            Self::BSS => 5,
        }
    }
}

/// The operand format of `opcode`. Unknown opcodes decode as `Z`.
#[must_use]
pub const fn format(opcode: u8) -> Fmt {
    match opcode {
        MOVE | LOADL | LOADI | LOADINEG | LOADSYM | GETGV | SETGV | GETSV | SETSV | GETIV
        | SETIV | GETCV | SETCV | GETCONST | SETCONST | GETMCNST | SETMCNST | RESCUE | KEY_P
        | KARG | ADDI | SUBI | ARRAY | SYMBOL | STRING | HASH | HASHADD | LAMBDA | BLOCK
        | METHOD | CLASS | MODULE | EXEC | DEF | ALIAS | CALL | SUPER => Fmt::BB,
        LOADI__1 | LOADI_0 | LOADI_1 | LOADI_2 | LOADI_3 | LOADI_4 | LOADI_5 | LOADI_6
        | LOADI_7 | LOADNIL | LOADSELF | LOADT | LOADF | GETIDX | SETIDX | EXCEPT | RAISEIF
        | RETURN | RETURN_BLK | BREAK | ADD | SUB | MUL | DIV | EQ | LT | LE | GT | GE
        | ARYCAT | ARYPUSH | ARYDUP | INTERN | STRCAT | HASHCAT | RANGE_INC | RANGE_EXC
        | OCLASS | UNDEF | SCLASS | TCLASS | ERR => Fmt::B,
        GETUPVAR | SETUPVAR | SSEND | SSENDB | SEND | SENDB | AREF | ASET | APOST | ARRAY2
        | DEBUG => Fmt::BBB,
        LOADI16 | JMPIF | JMPNOT | JMPNIL | ARGARY | BLKPUSH => Fmt::BS,
        LOADI32 => Fmt::BSS,
        JMP | JMPUW => Fmt::S,
        ENTER => Fmt::W,
        _ => Fmt::Z,
    }
}

/// Argument-spec accessors for the `ENTER` 24-bit word.
///
/// The word packs `m1:5 o:5 r:1 m2:5 k:5 d:1 b:1` from the high bit down;
/// Ruvi interprets the leading required/optional/rest fields.
pub mod aspec {
    /// Number of required arguments.
    #[inline]
    #[must_use]
    pub const fn required(w: u32) -> u8 {
        ((w >> 18) & 0x1f) as u8
    }

    /// Number of optional arguments.
    #[inline]
    #[must_use]
    pub const fn optional(w: u32) -> u8 {
        ((w >> 13) & 0x1f) as u8
    }

    /// Whether a rest argument collects the remainder.
    #[inline]
    #[must_use]
    pub const fn has_rest(w: u32) -> bool {
        (w >> 12) & 1 != 0
    }
}
