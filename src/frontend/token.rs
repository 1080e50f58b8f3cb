// src/frontend/token.rs

/// All token types in the Shrew language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Literals
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    Identifier,

    // Keywords
    KwAnd,
    KwElse,
    KwFalse,
    KwFor,
    KwFun,
    KwIf,
    KwIn,
    KwMap,
    KwNil,
    KwOr,
    KwReturn,
    KwStruct,
    KwTrue,
    KwVar,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    BangEq,
    Bang,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Eq,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    LessLess,
    GreaterGreater,
    At, // builtin-call marker

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Arrow, // ->

    // Special
    Eof,
    Error,
}

impl TokenType {
    /// Get string representation for error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntLiteral => "integer",
            Self::FloatLiteral => "float",
            Self::StringLiteral => "string",
            Self::Identifier => "identifier",
            Self::KwAnd => "and",
            Self::KwElse => "else",
            Self::KwFalse => "false",
            Self::KwFor => "for",
            Self::KwFun => "fun",
            Self::KwIf => "if",
            Self::KwIn => "in",
            Self::KwMap => "map",
            Self::KwNil => "nil",
            Self::KwOr => "or",
            Self::KwReturn => "return",
            Self::KwStruct => "struct",
            Self::KwTrue => "true",
            Self::KwVar => "var",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::EqEq => "==",
            Self::BangEq => "!=",
            Self::Bang => "!",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::Eq => "=",
            Self::Ampersand => "&",
            Self::Pipe => "|",
            Self::Caret => "^",
            Self::Tilde => "~",
            Self::LessLess => "<<",
            Self::GreaterGreater => ">>",
            Self::At => "@",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::LBrace => "{",
            Self::RBrace => "}",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::Comma => ",",
            Self::Semicolon => ";",
            Self::Colon => ":",
            Self::Dot => ".",
            Self::Arrow => "->",
            Self::Eof => "end of file",
            Self::Error => "error",
        }
    }

    /// Get precedence for binary operators (Pratt parsing). Zero means
    /// "not a binary operator".
    pub fn precedence(&self) -> u8 {
        match self {
            Self::KwOr => 1,
            Self::KwAnd => 2,
            Self::EqEq | Self::BangEq | Self::Lt | Self::Gt | Self::LtEq | Self::GtEq => 3,
            Self::Pipe => 4,
            Self::Caret => 5,
            Self::Ampersand => 6,
            Self::LessLess | Self::GreaterGreater => 7,
            Self::Plus | Self::Minus => 8,
            Self::Star | Self::Slash | Self::Percent => 9,
            _ => 0,
        }
    }
}

/// Source location span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize, // Byte offset
    pub end: usize,   // Byte offset (exclusive)
    pub line: u32,    // Start line (1-indexed)
    pub column: u32,  // Start column (1-indexed)
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start,
            end: other.end,
            line: self.line,
            column: self.column,
        }
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        // miette uses (offset, length)
        (span.start, span.end.saturating_sub(span.start)).into()
    }
}

impl From<&Span> for miette::SourceSpan {
    fn from(span: &Span) -> Self {
        (*span).into()
    }
}

/// A token with its location in source code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub ty: TokenType,
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(ty: TokenType, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            ty,
            lexeme: lexeme.into(),
            span,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_ordering() {
        assert!(TokenType::Star.precedence() > TokenType::Plus.precedence());
        assert!(TokenType::Plus.precedence() > TokenType::EqEq.precedence());
        assert!(TokenType::EqEq.precedence() > TokenType::KwAnd.precedence());
        assert!(TokenType::KwAnd.precedence() > TokenType::KwOr.precedence());
        assert_eq!(TokenType::Eq.precedence(), 0);
    }

    #[test]
    fn span_merge_keeps_outer_bounds() {
        let a = Span::new(0, 3, 1, 1);
        let b = Span::new(8, 12, 2, 4);
        let merged = a.merge(b);
        assert_eq!(merged.start, 0);
        assert_eq!(merged.end, 12);
        assert_eq!(merged.line, 1);
    }
}
