// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 The Ruvi Authors

//! Ruvi command-line shell.
//!
//! Loads a compiled `.mrb` image and runs it to completion on the host:
//!
//! ```text
//! ruvi [-m KILOBYTES] FILE.mrb
//! ```
//!
//! Exit codes: 0 on success, 1 on an uncaught exception, 2 on a load or
//! usage failure.

use ruvi_vm::console::StdConsole;
use ruvi_vm::memory::OwnedMemory;
use ruvi_vm::platform::StdPlatform;
use ruvi_vm::runtime::Runtime;
use std::process::ExitCode;

/// Default pool size in kilobytes.
const DEFAULT_POOL_KB: usize = 256;

fn main() -> ExitCode {
    let mut pool_kb = DEFAULT_POOL_KB;
    let mut file = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-m" => {
                let Some(kb) = args.next().and_then(|v| v.parse::<usize>().ok()) else {
                    eprintln!("ruvi: -m requires a size in kilobytes");
                    return ExitCode::from(2);
                };
                pool_kb = kb;
            }
            "-h" | "--help" => {
                println!("usage: ruvi [-m KILOBYTES] FILE.mrb");
                return ExitCode::SUCCESS;
            }
            other if file.is_none() => file = Some(other.to_string()),
            other => {
                eprintln!("ruvi: unexpected argument '{other}'");
                return ExitCode::from(2);
            }
        }
    }

    let Some(file) = file else {
        eprintln!("usage: ruvi [-m KILOBYTES] FILE.mrb");
        return ExitCode::from(2);
    };

    let image = match std::fs::read(&file) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("ruvi: cannot read {file}: {e}");
            return ExitCode::from(2);
        }
    };

    let mem = OwnedMemory::new(pool_kb * 1024);
    let mut rt = match Runtime::new(mem, StdConsole, StdPlatform::new()) {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("ruvi: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = rt.create_task(&image, None) {
        eprintln!("ruvi: {file}: {e}");
        return ExitCode::from(2);
    }

    if rt.run() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
