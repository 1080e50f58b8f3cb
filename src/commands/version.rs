// src/commands/version.rs

use std::process::ExitCode;

pub fn print_version() -> ExitCode {
    println!("shrew {}", env!("CARGO_PKG_VERSION"));
    ExitCode::SUCCESS
}
