// src/commands/run.rs

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use super::common::{compile, execute_main, read_stdin};

/// Compile and run a source file (or stdin if path is "-")
pub fn run_file(path: &Path) -> ExitCode {
    match execute(path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // An empty message means diagnostics were already rendered
            if !e.is_empty() {
                eprintln!("error: {}", e);
            }
            ExitCode::FAILURE
        }
    }
}

fn execute(path: &Path) -> Result<(), String> {
    let (source, file_path) = if path.as_os_str() == "-" {
        let source = read_stdin().map_err(|e| format!("could not read stdin: {}", e))?;
        (source, "<stdin>".to_string())
    } else {
        let source = fs::read_to_string(path)
            .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
        (source, path.to_string_lossy().to_string())
    };

    let compiled = compile(&source, &file_path).map_err(|()| String::new())?;
    execute_main(&compiled)
}
