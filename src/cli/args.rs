// src/cli/args.rs

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Color output mode
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect based on terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Shrew plan-language compiler and virtual machine
#[derive(Parser)]
#[command(name = "shrew")]
#[command(version)]
#[command(about = "Shrew query-plan language engine", long_about = None)]
pub struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    /// Source file to compile and run; omit to start the REPL
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile and run a Shrew source file
    Run {
        /// Path to the source file to execute
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Check source files for errors without running them
    Check {
        /// Files to check
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },
    /// Start an interactive session
    Repl,
    /// Print version information
    Version,
}
