// src/errors/report.rs
//! Rendering utilities for miette diagnostics.
//!
//! Diagnostics are collected as structured values during a phase and only
//! rendered here, after the phase completes.

use miette::{
    Diagnostic, GraphicalReportHandler, GraphicalTheme, NamedSource, Report, ThemeCharacters,
    ThemeStyles,
};
use std::io::IsTerminal;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::cli::ColorMode;

/// Global color mode setting (set once at startup)
static COLOR_MODE: AtomicU8 = AtomicU8::new(0); // 0 = Auto, 1 = Always, 2 = Never

/// Set the global color mode (call once at startup)
pub fn set_color_mode(mode: ColorMode) {
    let value = match mode {
        ColorMode::Auto => 0,
        ColorMode::Always => 1,
        ColorMode::Never => 2,
    };
    COLOR_MODE.store(value, Ordering::SeqCst);
}

fn should_use_color() -> bool {
    match COLOR_MODE.load(Ordering::SeqCst) {
        1 => true,
        2 => false,
        _ => std::io::stderr().is_terminal(),
    }
}

/// Create a handler for terminal output (unicode + colors based on mode).
fn terminal_handler() -> GraphicalReportHandler {
    let styles = if should_use_color() {
        ThemeStyles::ansi()
    } else {
        ThemeStyles::none()
    };
    let theme = GraphicalTheme {
        characters: ThemeCharacters::unicode(),
        styles,
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Create a handler for testing (ascii + no colors).
fn plain_handler() -> GraphicalReportHandler {
    let theme = GraphicalTheme {
        characters: ThemeCharacters::ascii(),
        styles: ThemeStyles::none(),
    };
    GraphicalReportHandler::new_themed(theme)
}

/// Render a batch of diagnostics against their source file to stderr.
pub fn render_to_stderr<E>(errors: Vec<E>, file: &str, source: &str)
where
    E: Diagnostic + Send + Sync + 'static,
{
    let handler = terminal_handler();
    for error in errors {
        let report =
            Report::new(error).with_source_code(NamedSource::new(file, source.to_string()));
        let mut output = String::new();
        if handler.render_report(&mut output, report.as_ref()).is_ok() {
            eprint!("{}", output);
        }
    }
}

/// Render a single diagnostic to a string without colors (for tests).
pub fn render_to_string(report: &dyn Diagnostic) -> String {
    let handler = plain_handler();
    let mut output = String::new();
    let _ = handler.render_report(&mut output, report);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LexerError;

    #[test]
    fn render_lexer_error_to_string() {
        let err = LexerError::UnexpectedCharacter {
            ch: '$',
            span: (0, 1).into(),
        };
        let report =
            Report::new(err).with_source_code(NamedSource::new("test.shrew", "$".to_string()));

        let output = render_to_string(report.as_ref());
        assert!(output.contains("E0001"), "should contain error code");
        assert!(
            output.contains("unexpected character"),
            "should contain message"
        );
    }

    #[test]
    fn render_with_help() {
        let err = LexerError::UnterminatedString { span: (0, 5).into() };
        let report = Report::new(err)
            .with_source_code(NamedSource::new("test.shrew", "\"scan".to_string()));

        let output = render_to_string(report.as_ref());
        assert!(output.contains("E0002"), "should contain error code");
        assert!(output.contains("help"), "should contain help text");
    }
}
