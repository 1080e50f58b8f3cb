// src/bin/shrew.rs

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use shrew::cli::{Cli, Commands};
use shrew::commands::check::check_files;
use shrew::commands::repl::repl;
use shrew::commands::run::run_file;
use shrew::commands::version::print_version;
use shrew::errors::set_color_mode;

fn main() -> ExitCode {
    // One-time subsystem initialization
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("SHREW_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    set_color_mode(cli.color);

    match (cli.command, cli.file) {
        (Some(Commands::Run { file }), _) => run_file(&file),
        (Some(Commands::Check { files }), _) => check_files(&files),
        (Some(Commands::Repl), _) => repl(),
        (Some(Commands::Version), _) => print_version(),
        (None, Some(file)) => run_file(&file),
        (None, None) => repl(),
    }
}
