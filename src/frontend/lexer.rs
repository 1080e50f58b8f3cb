// src/frontend/lexer.rs

use crate::errors::LexerError;
use crate::frontend::{Span, Token, TokenType};

pub struct Lexer<'src> {
    source: &'src str,
    chars: std::iter::Peekable<std::str::CharIndices<'src>>,
    start: usize,
    current: usize,
    line: u32,
    column: u32,
    start_column: u32,
    start_line: u32,
    // Error collection
    errors: Vec<LexerError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_column: 1,
            start_line: 1,
            errors: Vec::new(),
        }
    }

    /// Take all collected errors, leaving the internal list empty.
    pub fn take_errors(&mut self) -> Vec<LexerError> {
        std::mem::take(&mut self.errors)
    }

    /// Check if any errors have been collected.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Get the source string being lexed.
    pub fn source(&self) -> &'src str {
        self.source
    }

    /// Get the next token from the source
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        self.start = self.current;
        self.start_column = self.column;
        self.start_line = self.line;

        let Some(c) = self.advance() else {
            return self.make_token(TokenType::Eof);
        };

        match c {
            '(' => self.make_token(TokenType::LParen),
            ')' => self.make_token(TokenType::RParen),
            '{' => self.make_token(TokenType::LBrace),
            '}' => self.make_token(TokenType::RBrace),
            '[' => self.make_token(TokenType::LBracket),
            ']' => self.make_token(TokenType::RBracket),
            ',' => self.make_token(TokenType::Comma),
            ';' => self.make_token(TokenType::Semicolon),
            ':' => self.make_token(TokenType::Colon),
            '.' => self.make_token(TokenType::Dot),
            '@' => self.make_token(TokenType::At),
            '+' => self.make_token(TokenType::Plus),
            '*' => self.make_token(TokenType::Star),
            '%' => self.make_token(TokenType::Percent),
            '&' => self.make_token(TokenType::Ampersand),
            '|' => self.make_token(TokenType::Pipe),
            '^' => self.make_token(TokenType::Caret),
            '~' => self.make_token(TokenType::Tilde),
            '-' => {
                if self.match_char('>') {
                    self.make_token(TokenType::Arrow)
                } else {
                    self.make_token(TokenType::Minus)
                }
            }
            '=' => {
                if self.match_char('=') {
                    self.make_token(TokenType::EqEq)
                } else {
                    self.make_token(TokenType::Eq)
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.make_token(TokenType::BangEq)
                } else {
                    self.make_token(TokenType::Bang)
                }
            }
            '<' => {
                if self.match_char('<') {
                    self.make_token(TokenType::LessLess)
                } else if self.match_char('=') {
                    self.make_token(TokenType::LtEq)
                } else {
                    self.make_token(TokenType::Lt)
                }
            }
            '>' => {
                if self.match_char('>') {
                    self.make_token(TokenType::GreaterGreater)
                } else if self.match_char('=') {
                    self.make_token(TokenType::GtEq)
                } else {
                    self.make_token(TokenType::Gt)
                }
            }

            // Slash or comment
            '/' => {
                if self.match_char('/') {
                    // Comment - skip to end of line
                    while self.peek() != Some('\n') && self.peek().is_some() {
                        self.advance();
                    }
                    self.next_token()
                } else {
                    self.make_token(TokenType::Slash)
                }
            }

            // String literal
            '"' => self.string(),

            // Number literal
            c if c.is_ascii_digit() => self.number(),

            // Identifier or keyword
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),

            _ => self.error_unexpected_char(c),
        }
    }

    /// Skip whitespace, including newlines (statements are ';'-separated)
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('\n') => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                _ => break,
            }
        }
    }

    /// Advance to the next character and return it
    fn advance(&mut self) -> Option<char> {
        if let Some((idx, c)) = self.chars.next() {
            self.current = idx + c.len_utf8();
            self.column += 1;
            Some(c)
        } else {
            None
        }
    }

    /// Peek at the next character without consuming it
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    /// Consume the next character if it matches the expected character
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Create a token from start to current position
    fn make_token(&self, ty: TokenType) -> Token {
        let lexeme = &self.source[self.start..self.current];
        Token::new(
            ty,
            lexeme,
            Span::new(self.start, self.current, self.start_line, self.start_column),
        )
    }

    fn token_span(&self) -> Span {
        Span::new(self.start, self.current, self.start_line, self.start_column)
    }

    /// Create an error token and collect an error for an unexpected character.
    fn error_unexpected_char(&mut self, c: char) -> Token {
        let span = self.token_span();
        self.errors.push(LexerError::UnexpectedCharacter {
            ch: c,
            span: span.into(),
        });
        Token::new(TokenType::Error, format!("unexpected character '{}'", c), span)
    }

    fn string(&mut self) -> Token {
        loop {
            match self.peek() {
                Some('"') => {
                    self.advance();
                    // Strip the surrounding quotes from the lexeme
                    let lexeme = &self.source[self.start + 1..self.current - 1];
                    return Token::new(TokenType::StringLiteral, lexeme, self.token_span());
                }
                Some('\n') | None => {
                    let span = self.token_span();
                    self.errors
                        .push(LexerError::UnterminatedString { span: span.into() });
                    return Token::new(TokenType::Error, "unterminated string literal", span);
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn number(&mut self) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        // A '.' followed by a digit makes this a float literal
        let mut is_float = false;
        if self.peek() == Some('.') {
            let after_dot = {
                let mut iter = self.source[self.current..].chars();
                iter.next();
                iter.next()
            };
            if matches!(after_dot, Some(c) if c.is_ascii_digit()) {
                is_float = true;
                self.advance(); // '.'
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let ty = if is_float {
            TokenType::FloatLiteral
        } else {
            TokenType::IntLiteral
        };
        self.make_token(ty)
    }

    fn identifier(&mut self) -> Token {
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }

        let lexeme = &self.source[self.start..self.current];
        let ty = match lexeme {
            "and" => TokenType::KwAnd,
            "else" => TokenType::KwElse,
            "false" => TokenType::KwFalse,
            "for" => TokenType::KwFor,
            "fun" => TokenType::KwFun,
            "if" => TokenType::KwIf,
            "in" => TokenType::KwIn,
            "map" => TokenType::KwMap,
            "nil" => TokenType::KwNil,
            "or" => TokenType::KwOr,
            "return" => TokenType::KwReturn,
            "struct" => TokenType::KwStruct,
            "true" => TokenType::KwTrue,
            "var" => TokenType::KwVar,
            _ => TokenType::Identifier,
        };
        self.make_token(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<TokenType> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            if tok.ty == TokenType::Eof {
                break;
            }
            out.push(tok.ty);
        }
        out
    }

    #[test]
    fn lex_function_header() {
        let toks = lex_all("fun main() -> int32 {}");
        assert_eq!(
            toks,
            vec![
                TokenType::KwFun,
                TokenType::Identifier,
                TokenType::LParen,
                TokenType::RParen,
                TokenType::Arrow,
                TokenType::Identifier,
                TokenType::LBrace,
                TokenType::RBrace,
            ]
        );
    }

    #[test]
    fn lex_builtin_call() {
        let toks = lex_all("@sizeOf(int64)");
        assert_eq!(
            toks,
            vec![
                TokenType::At,
                TokenType::Identifier,
                TokenType::LParen,
                TokenType::Identifier,
                TokenType::RParen,
            ]
        );
    }

    #[test]
    fn lex_numbers() {
        let mut lexer = Lexer::new("42 3.25 7");
        assert_eq!(lexer.next_token().ty, TokenType::IntLiteral);
        let f = lexer.next_token();
        assert_eq!(f.ty, TokenType::FloatLiteral);
        assert_eq!(f.lexeme, "3.25");
        assert_eq!(lexer.next_token().ty, TokenType::IntLiteral);
    }

    #[test]
    fn member_access_is_not_a_float() {
        let toks = lex_all("row.a");
        assert_eq!(
            toks,
            vec![TokenType::Identifier, TokenType::Dot, TokenType::Identifier]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let toks = lex_all("var x // trailing\nvar y");
        assert_eq!(
            toks,
            vec![
                TokenType::KwVar,
                TokenType::Identifier,
                TokenType::KwVar,
                TokenType::Identifier,
            ]
        );
    }

    #[test]
    fn unterminated_string_collects_error() {
        let mut lexer = Lexer::new("\"abc");
        let tok = lexer.next_token();
        assert_eq!(tok.ty, TokenType::Error);
        assert!(lexer.has_errors());
    }

    #[test]
    fn line_tracking() {
        let mut lexer = Lexer::new("a\nb");
        let a = lexer.next_token();
        let b = lexer.next_token();
        assert_eq!(a.span.line, 1);
        assert_eq!(b.span.line, 2);
    }
}
