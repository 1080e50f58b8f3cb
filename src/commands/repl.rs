// src/commands/repl.rs

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use super::common::{compile, execute_main};

/// Line-based interactive session: lines accumulate until a blank line,
/// then the buffer is compiled and executed as one program.
pub fn repl() -> ExitCode {
    let stdin = io::stdin();
    let mut buffer = String::new();

    println!("shrew repl - finish a program with a blank line, Ctrl-D to quit");
    prompt(&buffer);

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };

        if line.trim().is_empty() {
            if !buffer.trim().is_empty() {
                run_buffer(&buffer);
                buffer.clear();
            }
        } else {
            buffer.push_str(&line);
            buffer.push('\n');
        }
        prompt(&buffer);
    }

    // Execute whatever is pending at EOF
    if !buffer.trim().is_empty() {
        run_buffer(&buffer);
    }
    ExitCode::SUCCESS
}

fn run_buffer(source: &str) {
    if let Ok(compiled) = compile(source, "<repl>") {
        if let Err(e) = execute_main(&compiled) {
            eprintln!("error: {}", e);
        }
    }
}

fn prompt(buffer: &str) {
    if buffer.is_empty() {
        print!("> ");
    } else {
        print!(". ");
    }
    let _ = io::stdout().flush();
}
