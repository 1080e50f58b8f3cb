// src/commands/check.rs

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use super::common::parse_and_analyze;

/// Type check files without running them
pub fn check_files(files: &[PathBuf]) -> ExitCode {
    let mut failed = false;
    for path in files {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                eprintln!("error: could not read '{}': {}", path.display(), e);
                failed = true;
                continue;
            }
        };
        let file = path.to_string_lossy();
        if parse_and_analyze(&source, &file).is_err() {
            failed = true;
        } else {
            println!("{}: ok", file);
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
