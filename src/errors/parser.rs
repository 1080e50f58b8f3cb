// src/errors/parser.rs
//! Parse errors (E1xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use super::LexerError;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum ParserError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Lexical(#[from] LexerError),

    #[error("expected expression, found '{token}'")]
    #[diagnostic(code(E1001))]
    ExpectedExpression {
        token: String,
        #[label("expected an expression")]
        span: SourceSpan,
    },

    #[error("expected '{expected}', found '{found}'")]
    #[diagnostic(code(E1002))]
    ExpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token")]
        span: SourceSpan,
    },

    #[error("unexpected token '{token}'")]
    #[diagnostic(code(E1003))]
    UnexpectedToken {
        token: String,
        #[label("not valid here")]
        span: SourceSpan,
    },

    #[error("expected type")]
    #[diagnostic(code(E1004))]
    ExpectedType {
        #[label("expected a type here")]
        span: SourceSpan,
    },

    #[error("invalid number literal")]
    #[diagnostic(code(E1005))]
    InvalidNumber {
        #[label("cannot be represented")]
        span: SourceSpan,
    },

    #[error("expected {what}")]
    #[diagnostic(code(E1006))]
    ExpectedIdentifier {
        what: String,
        #[label("expected identifier")]
        span: SourceSpan,
    },

    #[error("variable needs a type or an initializer")]
    #[diagnostic(code(E1007), help("write 'var x: type' or 'var x = value'"))]
    MissingTypeOrInitializer {
        #[label("cannot infer a type")]
        span: SourceSpan,
    },
}
